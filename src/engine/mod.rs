//! Deterministic analysis engine.
//!
//! Derives reproducible trait vectors from identifiers, ranks them, selects
//! diagnosis text, and computes synchrony or dominance for pairs. No I/O;
//! every call builds its own streams, so an `AnalysisEngine` can be shared
//! across threads freely.

pub mod diagnosis;
pub mod error;
pub mod overrides;
pub mod rank;
pub mod relation;
pub mod report;
pub mod stream;
pub mod traits;

use tracing::debug;

use crate::config::EngineConfig;

pub use diagnosis::{diagnose, Diagnosis, DiagnosisThresholds};
pub use error::EngineError;
pub use overrides::{Override, OverrideTable};
pub use rank::{aggregate_score, attack_score, defense_score, RankThresholds, RankTier};
pub use relation::{
    analyze_dominance, analyze_synchrony, dominance, sync_rate, DominanceAnalysis, Narrative,
    ResonanceAnalysis, ResonanceThresholds, VersusConfig, VersusOutcome, Winner,
};
pub use report::{
    render_report_markdown, short_id, Mode, ProfileReport, Report, ResonanceReport, VersusReport,
};
pub use stream::{polarize, SeededStream};
pub use traits::{
    canonicalize, generate, generate_attack, generate_defense, AttackField, AttackVector,
    DefenseField, DefenseVector, Role, TraitVector,
};

/// Seed suffixes for short IDs; disjoint from the trait role tags.
const SINGLE_ID_SUFFIX: &str = "#ID";
const ATTACK_ID_SUFFIX: &str = "#ID_S";
const RESONANCE_ID_SUFFIX: &str = "#ID_R";
const VERSUS_ID_SUFFIX: &str = "#ID_V";

/// Composes reports for the four analysis modes.
#[derive(Debug, Clone, Default)]
pub struct AnalysisEngine {
    config: EngineConfig,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Dispatch by mode. Single-identifier modes ignore `secondary`.
    pub fn analyze(
        &self,
        mode: Mode,
        primary: &str,
        secondary: Option<&str>,
    ) -> Result<Report, EngineError> {
        match mode {
            Mode::Single => self.analyze_single(primary),
            Mode::Attack => self.analyze_attacker(primary),
            Mode::Resonance => self.analyze_resonance(primary, secondary.unwrap_or("")),
            Mode::Versus => self.analyze_versus(primary, secondary.unwrap_or("")),
        }
    }

    /// SINGLE: one subject, defense role.
    pub fn analyze_single(&self, name: &str) -> Result<Report, EngineError> {
        let name = require_identifier(name)?;
        let overrides = &self.config.overrides;
        let stats = generate_defense(name, overrides);
        let score = defense_score(&stats);
        let report = ProfileReport {
            id: short_id(&format!("{name}{}{SINGLE_ID_SUFFIX}", overrides.salt_for(name))),
            name: name.to_string(),
            stats,
            score,
            rank: self.config.rank.rank(score),
            diagnosis: diagnosis::diagnose_defense(&stats, &self.config.diagnosis),
        };
        debug!(mode = "SINGLE", id = %report.id, rank = %report.rank, "report composed");
        Ok(Report::Single(report))
    }

    /// ATTACK: one subject, attack role.
    pub fn analyze_attacker(&self, name: &str) -> Result<Report, EngineError> {
        let name = require_identifier(name)?;
        let overrides = &self.config.overrides;
        let stats = generate_attack(name, overrides);
        let score = attack_score(&stats);
        let report = ProfileReport {
            id: short_id(&format!("{name}{}{ATTACK_ID_SUFFIX}", overrides.salt_for(name))),
            name: name.to_string(),
            stats,
            score,
            rank: self.config.rank.rank(score),
            diagnosis: diagnosis::diagnose_attack(&stats, &self.config.diagnosis),
        };
        debug!(mode = "ATTACK", id = %report.id, rank = %report.rank, "report composed");
        Ok(Report::Attack(report))
    }

    /// RESONANCE: synchrony between two subjects, both in the defense role.
    pub fn analyze_resonance(&self, first: &str, second: &str) -> Result<Report, EngineError> {
        let (first, second) = require_pair(Mode::Resonance, first, second)?;
        let a = generate_defense(first, &self.config.overrides);
        let b = generate_defense(second, &self.config.overrides);
        let analysis = analyze_synchrony(&a, &b, &self.config.resonance);
        let report = ResonanceReport {
            id: short_id(&format!("{first}&{second}{RESONANCE_ID_SUFFIX}")),
            names: [first.to_string(), second.to_string()],
            stats: [a, b],
            sync_rate: analysis.sync_rate,
            shared_weakness: analysis.shared_weakness,
            analysis: analysis.narrative,
        };
        debug!(
            mode = "RESONANCE",
            id = %report.id,
            sync_rate = report.sync_rate,
            narrative = %report.analysis.key,
            "report composed"
        );
        Ok(Report::Resonance(report))
    }

    /// VERSUS: `attacker` in the attack role against `defender` in the defense role.
    pub fn analyze_versus(&self, attacker: &str, defender: &str) -> Result<Report, EngineError> {
        let (attacker, defender) = require_pair(Mode::Versus, attacker, defender)?;
        let atk = generate_attack(attacker, &self.config.overrides);
        let def = generate_defense(defender, &self.config.overrides);
        let analysis = analyze_dominance(attacker, defender, &atk, &def, &self.config.versus);
        let winner = analysis.outcome.winner();
        let winner_name = match winner {
            Winner::Attacker => Some(attacker.to_string()),
            Winner::Defender => Some(defender.to_string()),
            Winner::Draw => None,
        };
        let report = VersusReport {
            id: short_id(&format!("{attacker}VS{defender}{VERSUS_ID_SUFFIX}")),
            names: [attacker.to_string(), defender.to_string()],
            attacker: atk,
            defender: def,
            dominance: analysis.dominance,
            outcome: analysis.outcome,
            winner,
            winner_name,
            signature: analysis.signature,
            weak_point: analysis.weak_point,
            analysis: analysis.narrative,
        };
        debug!(
            mode = "VERSUS",
            id = %report.id,
            dominance = report.dominance,
            outcome = report.outcome.key(),
            "report composed"
        );
        Ok(Report::Versus(report))
    }
}

fn require_identifier(name: &str) -> Result<&str, EngineError> {
    let name = canonicalize(name);
    if name.is_empty() {
        return Err(EngineError::InvalidIdentifier {
            reason: "identifier is empty after trimming",
        });
    }
    Ok(name)
}

fn require_pair<'a>(
    mode: Mode,
    first: &'a str,
    second: &'a str,
) -> Result<(&'a str, &'a str), EngineError> {
    let first = require_identifier(first)?;
    let second = canonicalize(second);
    if second.is_empty() {
        return Err(EngineError::MissingSecondIdentifier { mode });
    }
    Ok((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_rejects_blank_names() {
        let engine = AnalysisEngine::default();
        for name in ["", "   ", "\t\n"] {
            let err = engine.analyze_single(name).unwrap_err();
            assert_eq!(err.code(), "invalid_identifier");
        }
    }

    #[test]
    fn pair_modes_require_second_name() {
        let engine = AnalysisEngine::default();
        assert_eq!(
            engine.analyze_versus("X", "").unwrap_err(),
            EngineError::MissingSecondIdentifier { mode: Mode::Versus }
        );
        assert_eq!(
            engine.analyze(Mode::Resonance, "X", None).unwrap_err(),
            EngineError::MissingSecondIdentifier {
                mode: Mode::Resonance
            }
        );
        assert_eq!(
            engine.analyze_versus(" ", "Y").unwrap_err().code(),
            "invalid_identifier"
        );
    }

    #[test]
    fn dispatch_matches_direct_calls() {
        let engine = AnalysisEngine::default();
        assert_eq!(
            engine.analyze(Mode::Single, "kai", Some("ignored")).unwrap(),
            engine.analyze_single("kai").unwrap()
        );
        assert_eq!(
            engine.analyze(Mode::Versus, "kai", Some("lin")).unwrap(),
            engine.analyze_versus("kai", "lin").unwrap()
        );
    }

    #[test]
    fn report_names_are_canonical() {
        let engine = AnalysisEngine::default();
        let report = engine.analyze_single("  kai  ").unwrap();
        assert_eq!(report.names(), vec!["kai"]);
        assert_eq!(report, engine.analyze_single("kai").unwrap());
    }

    #[test]
    fn id_seed_is_independent_of_trait_seed() {
        let engine = AnalysisEngine::default();
        let Report::Single(single) = engine.analyze_single("kai").unwrap() else {
            panic!("expected SINGLE report");
        };
        let Report::Attack(attack) = engine.analyze_attacker("kai").unwrap() else {
            panic!("expected ATTACK report");
        };
        assert_eq!(single.id, short_id("kai#ID"));
        assert_eq!(attack.id, short_id("kai#ID_S"));
    }

    #[test]
    fn pair_ids_do_not_collide_with_single_ids() {
        let engine = AnalysisEngine::default();
        let single = engine.analyze_single("a&b").unwrap();
        let resonance = engine.analyze_resonance("a", "b").unwrap();
        assert_ne!(single.id(), resonance.id());
        assert_eq!(resonance.id(), short_id("a&b#ID_R"));

        let single = engine.analyze_single("aVSb").unwrap();
        let versus = engine.analyze_versus("a", "b").unwrap();
        assert_ne!(single.id(), versus.id());
        assert_eq!(versus.id(), short_id("aVSb#ID_V"));
    }

    #[test]
    fn versus_winner_follows_outcome() {
        let engine = AnalysisEngine::default();
        for (a, d) in [("kai", "lin"), ("lin", "kai"), ("mora", "vex"), ("vex", "mora")] {
            let Report::Versus(r) = engine.analyze_versus(a, d).unwrap() else {
                panic!("expected VERSUS report");
            };
            let expected = match r.outcome.winner() {
                Winner::Attacker => Some(a),
                Winner::Defender => Some(d),
                Winner::Draw => None,
            };
            assert_eq!(r.winner, r.outcome.winner());
            assert_eq!(r.winner_name.as_deref(), expected);
            assert_eq!(r.analysis.key, r.outcome.key());
        }
    }
}
