//! Two-entity metrics: synchrony between two defense vectors and dominance
//! of an attack vector over a defense vector.

use serde::{Deserialize, Serialize};

use super::traits::{AttackField, AttackVector, DefenseField, DefenseVector};

/// Selected relational narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Narrative {
    pub key: String,
    pub text: String,
}

impl Narrative {
    fn new(key: &str, text: String) -> Self {
        Self {
            key: key.to_string(),
            text,
        }
    }
}

// =============================================================================
// Synchrony
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResonanceThresholds {
    pub mirror_above: u8,
    pub collapse_endurance_below: u8,
    pub hazard_volume_above: u8,
    pub deadlock_endurance_above: u8,
    /// Both sides must exceed this on a sensitivity field to share a weakness.
    pub weakness_above: u8,
    /// ...and differ by strictly less than this.
    pub weakness_within: u8,
    pub rejection_below: u8,
}

impl Default for ResonanceThresholds {
    fn default() -> Self {
        Self {
            mirror_above: 90,
            collapse_endurance_below: 25,
            hazard_volume_above: 85,
            deadlock_endurance_above: 85,
            weakness_above: 70,
            weakness_within: 20,
            rejection_below: 20,
        }
    }
}

impl ResonanceThresholds {
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("mirror_above", self.mirror_above),
            ("collapse_endurance_below", self.collapse_endurance_below),
            ("hazard_volume_above", self.hazard_volume_above),
            ("deadlock_endurance_above", self.deadlock_endurance_above),
            ("weakness_above", self.weakness_above),
            ("weakness_within", self.weakness_within),
            ("rejection_below", self.rejection_below),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| *v > 100) {
            return Err(format!("resonance {name} must lie in 0..=100, got {value}"));
        }
        if self.rejection_below > self.mirror_above {
            return Err(format!(
                "rejection_below ({}) must not exceed mirror_above ({})",
                self.rejection_below, self.mirror_above
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResonanceAnalysis {
    pub sync_rate: u8,
    pub shared_weakness: Option<DefenseField>,
    pub narrative: Narrative,
}

/// `clamp(0, 100, floor(100 - Σ|a - b| / 4))` over all six fields.
pub fn sync_rate(a: &DefenseVector, b: &DefenseVector) -> u8 {
    let diff: u32 = a
        .values()
        .iter()
        .zip(b.values().iter())
        .map(|(x, y)| u32::from(x.abs_diff(*y)))
        .sum();
    (100.0 - f64::from(diff) / 4.0).floor().clamp(0.0, 100.0) as u8
}

/// First sensitivity field (canonical order) where both sides are high and close.
pub fn shared_weakness(
    a: &DefenseVector,
    b: &DefenseVector,
    t: &ResonanceThresholds,
) -> Option<DefenseField> {
    DefenseField::SENSITIVITY.into_iter().find(|f| {
        let (x, y) = (a.get(*f), b.get(*f));
        x > t.weakness_above && y > t.weakness_above && x.abs_diff(y) < t.weakness_within
    })
}

pub fn analyze_synchrony(
    a: &DefenseVector,
    b: &DefenseVector,
    t: &ResonanceThresholds,
) -> ResonanceAnalysis {
    let rate = sync_rate(a, b);
    let avg_endurance = (f64::from(a.endurance) + f64::from(b.endurance)) / 2.0;
    let avg_volume = (f64::from(a.volume) + f64::from(b.volume)) / 2.0;
    let weakness = shared_weakness(a, b, t);

    let narrative = if rate > t.mirror_above {
        Narrative::new(
            "mirror",
            format!(
                "[Twin Mirror] Sync rate {rate}%. An exceedingly rare neural attunement: the two sensory maps are near-identical, and any stimulus applied to one produces a real phantom echo in the other."
            ),
        )
    } else if avg_endurance < f64::from(t.collapse_endurance_below) {
        Narrative::new(
            "chain_collapse",
            "[Chain Collapse] Warning: both subjects' psychological defenses sit at the critical threshold. The moment one begins to plead, the other is emotionally infected within half a second and both fall like dominoes.".to_string(),
        )
    } else if avg_volume > f64::from(t.hazard_volume_above) {
        Narrative::new(
            "resonance_hazard",
            "[Acoustic Resonance Hazard] The two resonant cavities are tuned almost identically. A dual high-frequency scream during testing may crack the observation glass; industrial hearing protection is mandatory.".to_string(),
        )
    } else if avg_endurance > f64::from(t.deadlock_endurance_above) {
        Narrative::new(
            "deadlock",
            "[Abyssal Silence] A dead link. Both subjects run fortress-grade willpower and their pain gating cancels out; whatever is applied, only a suffocating silent standoff follows.".to_string(),
        )
    } else if let Some(field) = weakness {
        Narrative::new(
            "weak_point_echo",
            format!(
                "[Weak-Point Echo] Overall sync is unremarkable, but a fatal resonance flaw sits in the {}. Simultaneous stimulus there produces a one-plus-one-makes-three sensory overload.",
                field.label()
            ),
        )
    } else if rate < t.rejection_below {
        Narrative::new(
            "rejection",
            format!(
                "[Neural Rejection] Sync rate {rate}%. The sensory logics are fully opposed: one subject's hot zone is the other's dead zone. Forced linking causes severe cognitive dissonance and physiological aversion."
            ),
        )
    } else {
        Narrative::new(
            "coupling",
            format!(
                "[Standard Coupling] Sync rate {rate}%. The sensory maps overlap in places. Careful band tuning and a long warm-up are needed before the link can settle."
            ),
        )
    };

    ResonanceAnalysis {
        sync_rate: rate,
        shared_weakness: weakness,
        narrative,
    }
}

// =============================================================================
// Dominance
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VersusConfig {
    /// Multiplier applied to the attack/defense gap.
    pub scale: f64,
    /// Dominance beyond ±decisive is a decisive result.
    pub decisive: i32,
    /// Dominance beyond ±lean (and within ±decisive) leans one way.
    pub lean: i32,
}

impl Default for VersusConfig {
    fn default() -> Self {
        Self {
            scale: 1.5,
            decisive: 40,
            lean: 15,
        }
    }
}

impl VersusConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(format!(
                "versus scale must be positive and finite, got {}",
                self.scale
            ));
        }
        if self.lean < 0 || self.decisive <= self.lean {
            return Err(format!(
                "versus bands require decisive > lean >= 0, got decisive={} lean={}",
                self.decisive, self.lean
            ));
        }
        Ok(())
    }
}

/// Outcome bands, strongest attacker result first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersusOutcome {
    AttackerDecisive,
    AttackerLean,
    Draw,
    DefenderLean,
    DefenderDecisive,
}

impl VersusOutcome {
    pub fn from_dominance(dominance: i32, cfg: &VersusConfig) -> Self {
        if dominance > cfg.decisive {
            VersusOutcome::AttackerDecisive
        } else if dominance > cfg.lean {
            VersusOutcome::AttackerLean
        } else if dominance < -cfg.decisive {
            VersusOutcome::DefenderDecisive
        } else if dominance < -cfg.lean {
            VersusOutcome::DefenderLean
        } else {
            VersusOutcome::Draw
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            VersusOutcome::AttackerDecisive => "apex_predation",
            VersusOutcome::AttackerLean => "high_ground",
            VersusOutcome::Draw => "equilibrium",
            VersusOutcome::DefenderLean => "futile_assault",
            VersusOutcome::DefenderDecisive => "reversal",
        }
    }

    pub fn winner(&self) -> Winner {
        match self {
            VersusOutcome::AttackerDecisive | VersusOutcome::AttackerLean => Winner::Attacker,
            VersusOutcome::Draw => Winner::Draw,
            VersusOutcome::DefenderLean | VersusOutcome::DefenderDecisive => Winner::Defender,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Attacker,
    Defender,
    Draw,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DominanceAnalysis {
    pub dominance: i32,
    pub attack_avg: f64,
    pub defense_avg: f64,
    pub outcome: VersusOutcome,
    /// Attacker's strongest field.
    pub signature: AttackField,
    /// Defender's most exposed sensitivity field.
    pub weak_point: DefenseField,
    pub narrative: Narrative,
}

/// Mean of endurance and inverted mean sensitivity.
pub fn defense_average(def: &DefenseVector) -> f64 {
    (f64::from(def.endurance) + (100.0 - def.sensitivity_mean())) / 2.0
}

/// `floor((attack_avg - defense_avg) * scale)`.
///
/// Attacker and defender are scored with different field sets, so swapping
/// the two identifiers does not negate the result.
pub fn dominance(atk: &AttackVector, def: &DefenseVector, cfg: &VersusConfig) -> i32 {
    ((atk.mean() - defense_average(def)) * cfg.scale).floor() as i32
}

pub fn analyze_dominance(
    attacker: &str,
    defender: &str,
    atk: &AttackVector,
    def: &DefenseVector,
    cfg: &VersusConfig,
) -> DominanceAnalysis {
    let attack_avg = atk.mean();
    let defense_avg = defense_average(def);
    let dominance = dominance(atk, def, cfg);
    let outcome = VersusOutcome::from_dominance(dominance, cfg);
    // Lowest resistance (100 - sensitivity) is the highest sensitivity.
    let weak_point = def.most_sensitive();
    let signature = atk.signature();

    let style = signature.label();
    let weak = weak_point.label();
    let text = match outcome {
        VersusOutcome::AttackerDecisive => format!(
            "[Apex Predation] [{attacker}]'s {style} completely overruns [{defender}]'s defenses. Under precise strikes to the {weak}, the subject is projected to lose all composure within thirty seconds."
        ),
        VersusOutcome::AttackerLean => format!(
            "[High Ground] [{attacker}] holds the initiative, and {style} keeps returning to the {weak}. [{defender}] tries to endure, but the collapse of the line is only a matter of time."
        ),
        VersusOutcome::Draw => format!(
            "[Dynamic Equilibrium] An even match. [{attacker}]'s {style} and [{defender}]'s tolerance form a closed loop, and even the {weak} holds. An all-night tug of war decided by a hair."
        ),
        VersusOutcome::DefenderLean => format!(
            "[Futile Assault] [{defender}]'s will proves remarkably tough and deflects most of [{attacker}]'s {style}, even around the {weak}. The operator faces a severe backlash."
        ),
        VersusOutcome::DefenderDecisive => format!(
            "[Role Reversal] [{defender}]'s tolerance is abyssal. [{attacker}]'s {style} sinks without a ripple, the {weak} included, and exhaustion turns the hunter into the hunted."
        ),
    };

    DominanceAnalysis {
        dominance,
        attack_avg,
        defense_avg,
        outcome,
        signature,
        weak_point,
        narrative: Narrative::new(outcome.key(), text),
    }
}
