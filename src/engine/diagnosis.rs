//! Canned diagnosis selection for a single trait vector.
//!
//! Rules run top to bottom and the first match wins:
//!
//! 1. endurance above `iron_willed_above` → `iron_willed`
//! 2. endurance below `fragile_below` → `fragile`
//! 3. volume above `loud_above` → `loud`
//! 4. pick the strongest candidate field (first in canonical order on ties)
//! 5. strongest value below `flatline_below` → the role's flatline text
//! 6. the text keyed by that field, or the role default
//!
//! Attack vectors carry no endurance or volume field, so they start at rule 4
//! with all six fields as candidates.

use serde::{Deserialize, Serialize};

use super::traits::{
    first_max, AttackField, AttackVector, DefenseField, DefenseVector, TraitVector,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosisThresholds {
    pub iron_willed_above: u8,
    pub fragile_below: u8,
    pub loud_above: u8,
    pub flatline_below: u8,
}

impl Default for DiagnosisThresholds {
    fn default() -> Self {
        Self {
            iron_willed_above: 90,
            fragile_below: 15,
            loud_above: 95,
            flatline_below: 45,
        }
    }
}

impl DiagnosisThresholds {
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("iron_willed_above", self.iron_willed_above),
            ("fragile_below", self.fragile_below),
            ("loud_above", self.loud_above),
            ("flatline_below", self.flatline_below),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| *v > 100) {
            return Err(format!("diagnosis {name} must lie in 0..=100, got {value}"));
        }
        if self.fragile_below > self.iron_willed_above {
            return Err(format!(
                "fragile_below ({}) must not exceed iron_willed_above ({})",
                self.fragile_below, self.iron_willed_above
            ));
        }
        Ok(())
    }
}

/// Selected diagnosis text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    pub key: String,
    pub analysis: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Copy)]
pub struct CannedText {
    pub key: &'static str,
    pub analysis: &'static str,
    pub suggestion: &'static str,
}

impl CannedText {
    fn to_diagnosis(self) -> Diagnosis {
        Diagnosis {
            key: self.key.to_string(),
            analysis: self.analysis.to_string(),
            suggestion: self.suggestion.to_string(),
        }
    }
}

// =============================================================================
// Defense table
// =============================================================================

const DEFENSE_SUGGESTION: &str =
    "Run targeted nerve-tolerance conditioning against the weakest region first.";

pub const DEFENSE_DEFAULT: CannedText = CannedText {
    key: "baseline",
    analysis: "[Baseline Specimen] Every neural response sits at the reference level. No pronounced weakness and no standout strength: a blank page waiting for the operator to leave a mark.",
    suggestion: DEFENSE_SUGGESTION,
};

pub const DEFENSE_TABLE: &[CannedText] = &[
    CannedText {
        key: "waist",
        analysis: "[Flank Collapse] The lumbar nerve plexus is hypersensitive to contact. A violent twist-and-evade reflex was recorded; restraining this region dissolves every physical defense the subject has left.",
        suggestion: DEFENSE_SUGGESTION,
    },
    CannedText {
        key: "feet",
        analysis: "[Plantar Inversion] Plantar fascia signals route straight into the limbic system. Feather-weight stimulus produces overload and readily triggers an involuntary laughter short-circuit.",
        suggestion: DEFENSE_SUGGESTION,
    },
    CannedText {
        key: "axilla",
        analysis: "[Lymphatic Overdrive] Axillary defenses are completely offline. Stimulus here bypasses the rational layer and produces full-body spasms and an unfiltered stream of pleading.",
        suggestion: DEFENSE_SUGGESTION,
    },
    CannedText {
        key: "ears",
        analysis: "[Auditory Synesthesia] The auricular nerves are abnormally coupled to the startle circuit. A breath or a whisper at the ear root sends a paralysing current through the whole body.",
        suggestion: DEFENSE_SUGGESTION,
    },
    CannedText {
        key: "iron_willed",
        analysis: "[Iron Will] The subject's cortex runs high-grade pain gating. Routine stimulus disappears without a trace.",
        suggestion: "Switch to psychological pressure or extreme-duration sessions.",
    },
    CannedText {
        key: "fragile",
        analysis: "[Glass Mind] Psychological defenses are paper-thin. Before any real contact is made, the sight of the instruments or a stern voice is enough to trigger collapse.",
        suggestion: "Keep intensity minimal; the threat alone does most of the work.",
    },
    CannedText {
        key: "loud",
        analysis: "[Vocal Overload] Once stimulated, output volume breaks physiological limits. The scream carries through walls with alarming penetration.",
        suggestion: "Operate only inside a soundproofed chamber.",
    },
    CannedText {
        key: "low_sensitivity",
        analysis: "[Nerve Dullness] Peripheral conduction block detected across the body. The subject meets most physical stimulus with the indifference of a block of wood.",
        suggestion: "Standard methods will not land; escalate to a high-intensity wake-up protocol.",
    },
];

// =============================================================================
// Attack table
// =============================================================================

const ATTACK_SUGGESTION: &str =
    "Find a high-tolerance volunteer and move on to practical drills.";

pub const ATTACK_DEFAULT: CannedText = CannedText {
    key: "unclassified",
    analysis: "[Unclassified Operator] The profile does not match any catalogued school.",
    suggestion: ATTACK_SUGGESTION,
};

pub const ATTACK_TABLE: &[CannedText] = &[
    CannedText {
        key: "technique",
        analysis: "[Neuro-Anatomist] Surgeon-grade finger dexterity. Expert at working the gaps between nerves and holding the exact ratio of ache to tickle, leaving no way forward and no way out.",
        suggestion: ATTACK_SUGGESTION,
    },
    CannedText {
        key: "control",
        analysis: "[Absolute Dominion] Apex-predator pressure. No contact required: eye contact and sheer presence are enough to produce reflexive submission.",
        suggestion: ATTACK_SUGGESTION,
    },
    CannedText {
        key: "insight",
        analysis: "[Abyss Gazer] Exceptional micro-expression capture. Sees straight through feigned composure and strikes the spots the subject most wants to keep hidden.",
        suggestion: ATTACK_SUGGESTION,
    },
    CannedText {
        key: "intensity",
        analysis: "[Reward-Loop Mutation] An atypical dopamine response: every protest is fuel, and drive climbs exponentially as the subject's composure cracks.",
        suggestion: ATTACK_SUGGESTION,
    },
    CannedText {
        key: "stamina",
        analysis: "[Perpetual Engine] Physical reserves beyond human norms. Sustains high-frequency sessions for hours and leaves the subject convinced it will never end.",
        suggestion: ATTACK_SUGGESTION,
    },
    CannedText {
        key: "tools",
        analysis: "[Instrument Master] A ruthless grasp of applied physics. Silk, feathers, brushes: any object becomes a precision instrument in these hands.",
        suggestion: ATTACK_SUGGESTION,
    },
    CannedText {
        key: "apprentice",
        analysis: "[Trainee Operator] Balanced fundamentals, but no signature style has formed yet.",
        suggestion: "Log plenty of practical sessions to discover a personal school.",
    },
];

fn lookup(table: &[CannedText], key: &str, default: CannedText) -> Diagnosis {
    table
        .iter()
        .find(|entry| entry.key == key)
        .copied()
        .unwrap_or(default)
        .to_diagnosis()
}

// =============================================================================
// Selection
// =============================================================================

pub fn diagnose_defense(v: &DefenseVector, t: &DiagnosisThresholds) -> Diagnosis {
    diagnose_defense_with(v, t, DEFENSE_TABLE)
}

pub(crate) fn diagnose_defense_with(
    v: &DefenseVector,
    t: &DiagnosisThresholds,
    table: &[CannedText],
) -> Diagnosis {
    let key = if v.endurance > t.iron_willed_above {
        "iron_willed"
    } else if v.endurance < t.fragile_below {
        "fragile"
    } else if v.volume > t.loud_above {
        "loud"
    } else {
        let strongest = first_max(&DefenseField::SENSITIVITY, |f| v.get(*f));
        if v.get(strongest) < t.flatline_below {
            "low_sensitivity"
        } else {
            strongest.key()
        }
    };
    lookup(table, key, DEFENSE_DEFAULT)
}

pub fn diagnose_attack(v: &AttackVector, t: &DiagnosisThresholds) -> Diagnosis {
    diagnose_attack_with(v, t, ATTACK_TABLE)
}

pub(crate) fn diagnose_attack_with(
    v: &AttackVector,
    t: &DiagnosisThresholds,
    table: &[CannedText],
) -> Diagnosis {
    let strongest = first_max(&AttackField::ALL, |f| v.get(*f));
    let key = if v.get(strongest) < t.flatline_below {
        "apprentice"
    } else {
        strongest.key()
    };
    lookup(table, key, ATTACK_DEFAULT)
}

pub fn diagnose(v: &TraitVector, t: &DiagnosisThresholds) -> Diagnosis {
    match v {
        TraitVector::Defense(d) => diagnose_defense(d, t),
        TraitVector::Attack(a) => diagnose_attack(a, t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defense(
        waist: u8,
        feet: u8,
        axilla: u8,
        ears: u8,
        endurance: u8,
        volume: u8,
    ) -> DefenseVector {
        DefenseVector {
            waist,
            feet,
            axilla,
            ears,
            endurance,
            volume,
        }
    }

    fn attack(values: [u8; 6]) -> AttackVector {
        AttackVector {
            technique: values[0],
            control: values[1],
            insight: values[2],
            intensity: values[3],
            stamina: values[4],
            tools: values[5],
        }
    }

    #[test]
    fn iron_will_preempts_sensitivity() {
        let t = DiagnosisThresholds::default();
        let d = diagnose_defense(&defense(80, 80, 80, 80, 95, 50), &t);
        assert_eq!(d.key, "iron_willed");
    }

    #[test]
    fn fragile_preempts_loud() {
        let t = DiagnosisThresholds::default();
        let d = diagnose_defense(&defense(99, 10, 10, 10, 5, 99), &t);
        assert_eq!(d.key, "fragile");
    }

    #[test]
    fn loud_preempts_sensitivity() {
        let t = DiagnosisThresholds::default();
        let d = diagnose_defense(&defense(99, 10, 10, 10, 50, 97), &t);
        assert_eq!(d.key, "loud");
    }

    #[test]
    fn endurance_thresholds_are_exclusive() {
        let t = DiagnosisThresholds::default();
        assert_eq!(diagnose_defense(&defense(70, 0, 0, 0, 90, 0), &t).key, "waist");
        assert_eq!(diagnose_defense(&defense(70, 0, 0, 0, 15, 0), &t).key, "waist");
        assert_eq!(diagnose_defense(&defense(70, 0, 0, 0, 50, 95), &t).key, "waist");
    }

    #[test]
    fn strongest_sensitivity_selects_text() {
        let t = DiagnosisThresholds::default();
        let d = diagnose_defense(&defense(20, 30, 88, 40, 50, 50), &t);
        assert_eq!(d.key, "axilla");
        assert!(d.analysis.starts_with("[Lymphatic Overdrive]"));
    }

    #[test]
    fn ties_go_to_earliest_field() {
        let t = DiagnosisThresholds::default();
        assert_eq!(diagnose_defense(&defense(10, 77, 77, 77, 50, 50), &t).key, "feet");
        assert_eq!(diagnose_attack(&attack([60, 60, 90, 90, 0, 0]), &t).key, "insight");
    }

    #[test]
    fn flatline_ignores_field_identity() {
        let t = DiagnosisThresholds::default();
        assert_eq!(
            diagnose_defense(&defense(44, 30, 20, 10, 50, 50), &t).key,
            "low_sensitivity"
        );
        assert_eq!(diagnose_attack(&attack([44, 1, 2, 3, 4, 5]), &t).key, "apprentice");
        assert_eq!(diagnose_attack(&attack([45, 1, 2, 3, 4, 5]), &t).key, "technique");
    }

    #[test]
    fn missing_entry_falls_back_to_default() {
        let t = DiagnosisThresholds::default();
        let partial = &DEFENSE_TABLE[..1];
        let d = diagnose_defense_with(&defense(10, 90, 10, 10, 50, 50), &t, partial);
        assert_eq!(d.key, DEFENSE_DEFAULT.key);

        let d = diagnose_attack_with(&attack([0, 0, 0, 0, 0, 80]), &t, &[]);
        assert_eq!(d.key, ATTACK_DEFAULT.key);
    }

    #[test]
    fn every_field_has_an_entry() {
        for f in DefenseField::SENSITIVITY {
            assert!(DEFENSE_TABLE.iter().any(|e| e.key == f.key()));
        }
        for f in AttackField::ALL {
            assert!(ATTACK_TABLE.iter().any(|e| e.key == f.key()));
        }
    }
}
