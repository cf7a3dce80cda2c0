//! Report types, short IDs and markdown rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::diagnosis::Diagnosis;
use super::rank::RankTier;
use super::relation::{Narrative, VersusOutcome, Winner};
use super::stream::SeededStream;
use super::traits::{AttackField, AttackVector, DefenseField, DefenseVector};

const ID_PREFIX: &str = "TK";
const ID_LETTERS: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Short display ID `TK-NNNN-L` drawn from its own stream.
pub fn short_id(seed: &str) -> String {
    let mut stream = SeededStream::new(seed);
    let num = stream.next_below(10_000);
    let letter = ID_LETTERS[stream.next_below(26) as usize] as char;
    format!("{ID_PREFIX}-{num:04}-{letter}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Single,
    Attack,
    Resonance,
    Versus,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Single => "SINGLE",
            Mode::Attack => "ATTACK",
            Mode::Resonance => "RESONANCE",
            Mode::Versus => "VERSUS",
        }
    }

    /// Whether the mode needs two identifiers.
    pub fn is_pair(&self) -> bool {
        matches!(self, Mode::Resonance | Mode::Versus)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SINGLE" => Ok(Mode::Single),
            "ATTACK" => Ok(Mode::Attack),
            "RESONANCE" => Ok(Mode::Resonance),
            "VERSUS" => Ok(Mode::Versus),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

// =============================================================================
// Report payloads
// =============================================================================

/// One subject profiled in one role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileReport<V> {
    pub id: String,
    pub name: String,
    pub stats: V,
    pub score: u32,
    pub rank: RankTier,
    pub diagnosis: Diagnosis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResonanceReport {
    pub id: String,
    pub names: [String; 2],
    pub stats: [DefenseVector; 2],
    pub sync_rate: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_weakness: Option<DefenseField>,
    pub analysis: Narrative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersusReport {
    pub id: String,
    /// Attacker first, defender second.
    pub names: [String; 2],
    pub attacker: AttackVector,
    pub defender: DefenseVector,
    pub dominance: i32,
    pub outcome: VersusOutcome,
    pub winner: Winner,
    /// Name of the winning side; absent on a draw.
    pub winner_name: Option<String>,
    pub signature: AttackField,
    pub weak_point: DefenseField,
    pub analysis: Narrative,
}

/// Immutable result of one engine call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Report {
    Single(ProfileReport<DefenseVector>),
    Attack(ProfileReport<AttackVector>),
    Resonance(ResonanceReport),
    Versus(VersusReport),
}

impl Report {
    pub fn mode(&self) -> Mode {
        match self {
            Report::Single(_) => Mode::Single,
            Report::Attack(_) => Mode::Attack,
            Report::Resonance(_) => Mode::Resonance,
            Report::Versus(_) => Mode::Versus,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Report::Single(r) => &r.id,
            Report::Attack(r) => &r.id,
            Report::Resonance(r) => &r.id,
            Report::Versus(r) => &r.id,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            Report::Single(r) => vec![r.name.as_str()],
            Report::Attack(r) => vec![r.name.as_str()],
            Report::Resonance(r) => r.names.iter().map(String::as_str).collect(),
            Report::Versus(r) => r.names.iter().map(String::as_str).collect(),
        }
    }

    pub fn rank(&self) -> Option<RankTier> {
        match self {
            Report::Single(r) => Some(r.rank),
            Report::Attack(r) => Some(r.rank),
            _ => None,
        }
    }

    /// Engine-selected text: the diagnosis analysis or the relational narrative.
    pub fn analysis(&self) -> &str {
        match self {
            Report::Single(r) => &r.diagnosis.analysis,
            Report::Attack(r) => &r.diagnosis.analysis,
            Report::Resonance(r) => &r.analysis.text,
            Report::Versus(r) => &r.analysis.text,
        }
    }

    /// Trait vectors as a JSON value, for prompt grounding.
    pub fn stats_json(&self) -> serde_json::Value {
        let value = match self {
            Report::Single(r) => serde_json::to_value(r.stats),
            Report::Attack(r) => serde_json::to_value(r.stats),
            Report::Resonance(r) => serde_json::to_value(r.stats),
            Report::Versus(r) => serde_json::to_value((r.attacker, r.defender)),
        };
        // Plain structs of integers always serialize.
        value.unwrap_or(serde_json::Value::Null)
    }
}

// =============================================================================
// Markdown
// =============================================================================

pub fn render_report_markdown(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {} report {}\n\n", report.mode(), report.id()));

    match report {
        Report::Single(r) => {
            out.push_str(&format!("**Subject:** {}  \n", r.name));
            out.push_str(&format!("**Rank:** {} (score {})\n\n", r.rank, r.score));
            push_defense_table(&mut out, &[(&r.name, &r.stats)]);
            push_diagnosis(&mut out, &r.diagnosis);
        }
        Report::Attack(r) => {
            out.push_str(&format!("**Operator:** {}  \n", r.name));
            out.push_str(&format!("**Rank:** {} (score {})\n\n", r.rank, r.score));
            push_attack_table(&mut out, &r.name, &r.stats);
            push_diagnosis(&mut out, &r.diagnosis);
        }
        Report::Resonance(r) => {
            out.push_str(&format!(
                "**Pair:** {} & {}  \n**Sync rate:** {}%\n\n",
                r.names[0], r.names[1], r.sync_rate
            ));
            push_defense_table(&mut out, &[(&r.names[0], &r.stats[0]), (&r.names[1], &r.stats[1])]);
            out.push_str(&format!("## Analysis\n\n{}\n", r.analysis.text));
        }
        Report::Versus(r) => {
            out.push_str(&format!(
                "**Attacker:** {}  \n**Defender:** {}  \n**Dominance:** {}  \n**Winner:** {}\n\n",
                r.names[0],
                r.names[1],
                r.dominance,
                r.winner_name.as_deref().unwrap_or("draw")
            ));
            push_attack_table(&mut out, &r.names[0], &r.attacker);
            push_defense_table(&mut out, &[(&r.names[1], &r.defender)]);
            out.push_str(&format!("## Analysis\n\n{}\n", r.analysis.text));
        }
    }
    out
}

fn push_defense_table(out: &mut String, rows: &[(&str, &DefenseVector)]) {
    out.push_str("| subject |");
    for f in DefenseField::ALL {
        out.push_str(&format!(" {} |", f.key()));
    }
    out.push_str("\n|---|");
    out.push_str(&"---:|".repeat(DefenseField::ALL.len()));
    out.push('\n');
    for (name, v) in rows {
        out.push_str(&format!("| {name} |"));
        for value in v.values() {
            out.push_str(&format!(" {value} |"));
        }
        out.push('\n');
    }
    out.push('\n');
}

fn push_attack_table(out: &mut String, name: &str, v: &AttackVector) {
    out.push_str("| operator |");
    for f in AttackField::ALL {
        out.push_str(&format!(" {} |", f.key()));
    }
    out.push_str("\n|---|");
    out.push_str(&"---:|".repeat(AttackField::ALL.len()));
    out.push_str(&format!("\n| {name} |"));
    for value in v.values() {
        out.push_str(&format!(" {value} |"));
    }
    out.push_str("\n\n");
}

fn push_diagnosis(out: &mut String, d: &Diagnosis) {
    out.push_str(&format!(
        "## Diagnosis\n\n{}\n\n**Suggestion:** {}\n",
        d.analysis, d.suggestion
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_format() {
        let id = short_id("alice#ID");
        assert_eq!(id.len(), "TK-0000-A".len());
        assert!(id.starts_with("TK-"));
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert!(parts[2].chars().all(|c| c.is_ascii_uppercase()));
        assert_eq!(id, short_id("alice#ID"));
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("versus".parse::<Mode>(), Ok(Mode::Versus));
        assert_eq!(" Single ".parse::<Mode>(), Ok(Mode::Single));
        assert!("duel".parse::<Mode>().is_err());
        assert!(Mode::Resonance.is_pair());
        assert!(!Mode::Attack.is_pair());
    }
}
