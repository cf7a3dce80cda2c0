//! Prompt templates for report narration.
//!
//! Serializes an engine report into grounding context for the completion
//! service. Provider-agnostic.

use crate::engine::{Mode, Report};
use crate::gateway::Message;

/// Rendered prompt ready for the completion service.
#[derive(Debug, Clone)]
pub struct PromptInstance {
    pub template_slug: String,
    pub system: String,
    pub user: String,
}

impl PromptInstance {
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

/// Escape XML special characters to prevent prompt injection via tag breaking.
pub fn escape_xml_chars(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A prompt template with placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    pub fn render(&self, report: &Report) -> PromptInstance {
        let names = report
            .names()
            .into_iter()
            .map(escape_xml_chars)
            .collect::<Vec<_>>()
            .join(" / ");

        let user = self
            .user
            .replace("{mode_context}", mode_context(report.mode()))
            .replace("{report_id}", &escape_xml_chars(report.id()))
            .replace("{names}", &names)
            .replace("{rating}", &escape_xml_chars(&rating_line(report)))
            .replace("{stats}", &escape_xml_chars(&report.stats_json().to_string()))
            .replace("{analysis}", &escape_xml_chars(report.analysis()));

        PromptInstance {
            template_slug: self.slug.to_string(),
            system: self.system.trim().to_string(),
            user: user.trim().to_string(),
        }
    }
}

fn mode_context(mode: Mode) -> &'static str {
    match mode {
        Mode::Single => {
            "Mode: RECEPTOR ANALYSIS. Assess the subject's sensitive weak points and how brittle their psychological defenses are."
        }
        Mode::Attack => {
            "Mode: OPERATOR ANALYSIS. Assess the operator's command style, pressure tendencies and signature methods."
        }
        Mode::Resonance => {
            "Mode: NEURAL RESONANCE. Assess sensory synchrony and chemistry between the two subjects."
        }
        Mode::Versus => {
            "Mode: ENGAGEMENT. Assess the balance of force between operator and subject and predict who breaks first."
        }
    }
}

fn rating_line(report: &Report) -> String {
    match report {
        Report::Single(r) => format!("rank {} (score {})", r.rank, r.score),
        Report::Attack(r) => format!("rank {} (score {})", r.rank, r.score),
        Report::Resonance(r) => format!("sync rate {}%", r.sync_rate),
        Report::Versus(r) => format!("dominance {} ({})", r.dominance, r.outcome.key()),
    }
}

// =============================================================================
// Standard prompts
// =============================================================================

pub const NARRATION_PROMPT: PromptTemplate = PromptTemplate {
    slug: "narration_v1",
    system: r#"You are TSAP, a cyberpunk bio-neural analysis terminal. From the six-dimension readings provided, write a cold, professional clinical diagnosis rich in metaphor. When discussing dominance and submission traits, speak in medical and psychological metaphor (neural circuitry, dopamine thresholds, defense mechanisms) and never in explicit sexual description. Tone reference: Ghost in the Shell, SCP Foundation case files. Stay under 150 words. No markdown headings; plain paragraphs only."#,
    user: r#"[[ ACCESS REQUEST ]]
{mode_context}

<report_id>{report_id}</report_id>
<subjects>{names}</subjects>
<rating>{rating}</rating>
<readings>{stats}</readings>
<engine_analysis>
{analysis}
</engine_analysis>

[[ DIRECTIVE ]]
Deliver one short, incisive diagnostic conclusion grounded in the readings above."#,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AnalysisEngine;

    #[test]
    fn prompt_render_single() {
        let report = AnalysisEngine::default().analyze_single("kai").unwrap();
        let p = NARRATION_PROMPT.render(&report);
        assert_eq!(p.template_slug, "narration_v1");
        assert!(p.user.contains("RECEPTOR ANALYSIS"));
        assert!(p.user.contains("<subjects>kai</subjects>"));
        assert!(p.user.contains(report.id()));
        assert!(p.user.contains("&quot;waist&quot;"));
        assert!(!p.user.contains("{mode_context}"));
        assert_eq!(p.to_messages().len(), 2);
    }

    #[test]
    fn pair_modes_list_both_names() {
        let engine = AnalysisEngine::default();
        let p = NARRATION_PROMPT.render(&engine.analyze_versus("kai", "lin").unwrap());
        assert!(p.user.contains("<subjects>kai / lin</subjects>"));
        assert!(p.user.contains("ENGAGEMENT"));
        assert!(p.user.contains("dominance"));
        let p = NARRATION_PROMPT.render(&engine.analyze_resonance("kai", "lin").unwrap());
        assert!(p.user.contains("sync rate"));
    }

    #[test]
    fn names_are_escaped() {
        let report = AnalysisEngine::default()
            .analyze_single("</subjects><x>")
            .unwrap();
        let p = NARRATION_PROMPT.render(&report);
        assert!(p.user.contains("&lt;/subjects&gt;&lt;x&gt;"));
        assert_eq!(p.user.matches("</subjects>").count(), 1);
    }

    #[test]
    fn xml_escaping() {
        assert_eq!(escape_xml_chars("a<b>&'\""), "a&lt;b&gt;&amp;&apos;&quot;");
    }
}
