//! Aggregate scores and rank tiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::traits::{AttackVector, DefenseVector, TraitVector};

/// Ordered rank tiers, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RankTier {
    N,
    R,
    SR,
    SSR,
    UR,
    EX,
}

impl RankTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankTier::N => "N",
            RankTier::R => "R",
            RankTier::SR => "SR",
            RankTier::SSR => "SSR",
            RankTier::UR => "UR",
            RankTier::EX => "EX",
        }
    }
}

impl fmt::Display for RankTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exclusive lower bounds for each tier above N.
///
/// A score strictly greater than `ex` is EX, greater than `ur` is UR, and so
/// on down to `r`. Everything else is N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankThresholds {
    pub ex: u32,
    pub ur: u32,
    pub ssr: u32,
    pub sr: u32,
    pub r: u32,
}

impl Default for RankThresholds {
    fn default() -> Self {
        Self {
            ex: 520,
            ur: 500,
            ssr: 420,
            sr: 340,
            r: 260,
        }
    }
}

impl RankThresholds {
    /// Bands must be strictly descending so every score has exactly one tier.
    pub fn validate(&self) -> Result<(), String> {
        let cutoffs = [self.ex, self.ur, self.ssr, self.sr, self.r];
        if cutoffs.windows(2).all(|w| w[0] > w[1]) {
            Ok(())
        } else {
            Err(format!(
                "rank cutoffs must be strictly descending (ex > ur > ssr > sr > r), got {cutoffs:?}"
            ))
        }
    }

    pub fn rank(&self, score: u32) -> RankTier {
        if score > self.ex {
            RankTier::EX
        } else if score > self.ur {
            RankTier::UR
        } else if score > self.ssr {
            RankTier::SSR
        } else if score > self.sr {
            RankTier::SR
        } else if score > self.r {
            RankTier::R
        } else {
            RankTier::N
        }
    }
}

/// Sensitivities plus volume plus inverted endurance: low willpower counts
/// as fragility and raises the score.
pub fn defense_score(v: &DefenseVector) -> u32 {
    let sensitivities =
        u32::from(v.waist) + u32::from(v.feet) + u32::from(v.axilla) + u32::from(v.ears);
    sensitivities + u32::from(v.volume) + (100 - u32::from(v.endurance.min(100)))
}

pub fn attack_score(v: &AttackVector) -> u32 {
    v.values().iter().map(|x| u32::from(*x)).sum()
}

pub fn aggregate_score(v: &TraitVector) -> u32 {
    match v {
        TraitVector::Defense(d) => defense_score(d),
        TraitVector::Attack(a) => attack_score(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defense(sens: u8, endurance: u8, volume: u8) -> DefenseVector {
        DefenseVector {
            waist: sens,
            feet: sens,
            axilla: sens,
            ears: sens,
            endurance,
            volume,
        }
    }

    #[test]
    fn tiers_are_ordered() {
        assert!(RankTier::N < RankTier::R);
        assert!(RankTier::SSR < RankTier::UR);
        assert!(RankTier::UR < RankTier::EX);
    }

    #[test]
    fn band_edges_are_exclusive() {
        let t = RankThresholds::default();
        assert_eq!(t.rank(0), RankTier::N);
        assert_eq!(t.rank(260), RankTier::N);
        assert_eq!(t.rank(261), RankTier::R);
        assert_eq!(t.rank(340), RankTier::R);
        assert_eq!(t.rank(341), RankTier::SR);
        assert_eq!(t.rank(421), RankTier::SSR);
        assert_eq!(t.rank(501), RankTier::UR);
        assert_eq!(t.rank(521), RankTier::EX);
        assert_eq!(t.rank(u32::MAX), RankTier::EX);
    }

    #[test]
    fn defense_score_inverts_endurance() {
        assert_eq!(defense_score(&defense(0, 0, 0)), 100);
        assert_eq!(defense_score(&defense(0, 99, 0)), 1);
        assert_eq!(defense_score(&defense(99, 0, 99)), 99 * 5 + 100);
    }

    #[test]
    fn rank_is_monotonic_in_each_field() {
        let t = RankThresholds::default();
        let weak = defense(40, 80, 40);
        let mut prev = t.rank(defense_score(&weak));
        // Raising sensitivity/volume or lowering endurance never drops the tier.
        for step in 0..40u8 {
            let v = defense(40 + step, 80 - step * 2, 40 + step);
            let tier = t.rank(defense_score(&v));
            assert!(tier >= prev, "tier dropped at step {step}");
            prev = tier;
        }

        let low = AttackVector {
            technique: 10,
            control: 20,
            insight: 30,
            intensity: 40,
            stamina: 50,
            tools: 60,
        };
        let high = AttackVector {
            technique: 99,
            control: 20,
            insight: 98,
            intensity: 40,
            stamina: 97,
            tools: 96,
        };
        assert!(t.rank(attack_score(&high)) >= t.rank(attack_score(&low)));
    }

    #[test]
    fn validate_rejects_non_descending_cutoffs() {
        assert!(RankThresholds::default().validate().is_ok());
        let bad = RankThresholds {
            ur: 530,
            ..RankThresholds::default()
        };
        assert!(bad.validate().is_err());
    }
}
