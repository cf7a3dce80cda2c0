//! Trait vectors: the two six-field layouts and their seeded generation.
//!
//! Field order is part of the seed contract. Each field consumes exactly one
//! polarized draw in the order listed by `DefenseField::ALL` /
//! `AttackField::ALL`; reordering either list changes every downstream value.

use serde::{Deserialize, Serialize};

use super::overrides::OverrideTable;
use super::stream::SeededStream;

/// Seed suffix for defense-role draws.
pub const DEFENSE_ROLE_TAG: &str = "_M_MODE_V13";
/// Seed suffix for attack-role draws.
pub const ATTACK_ROLE_TAG: &str = "_S_MODE_V8";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Defense,
    Attack,
}

impl Role {
    pub fn seed_tag(&self) -> &'static str {
        match self {
            Role::Defense => DEFENSE_ROLE_TAG,
            Role::Attack => ATTACK_ROLE_TAG,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Defense => "defense",
            Role::Attack => "attack",
        }
    }
}

/// Trim an identifier to its canonical form.
pub fn canonicalize(identifier: &str) -> &str {
    identifier.trim()
}

// =============================================================================
// Defense layout
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseField {
    Waist,
    Feet,
    Axilla,
    Ears,
    Endurance,
    Volume,
}

impl DefenseField {
    /// Canonical draw order.
    pub const ALL: [DefenseField; 6] = [
        DefenseField::Waist,
        DefenseField::Feet,
        DefenseField::Axilla,
        DefenseField::Ears,
        DefenseField::Endurance,
        DefenseField::Volume,
    ];

    /// The four sensitivity fields, in canonical order.
    pub const SENSITIVITY: [DefenseField; 4] = [
        DefenseField::Waist,
        DefenseField::Feet,
        DefenseField::Axilla,
        DefenseField::Ears,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            DefenseField::Waist => "waist",
            DefenseField::Feet => "feet",
            DefenseField::Axilla => "axilla",
            DefenseField::Ears => "ears",
            DefenseField::Endurance => "endurance",
            DefenseField::Volume => "volume",
        }
    }

    /// Anatomical label used in narratives.
    pub fn label(&self) -> &'static str {
        match self {
            DefenseField::Waist => "lumbar flank",
            DefenseField::Feet => "plantar arch",
            DefenseField::Axilla => "axillary hollow",
            DefenseField::Ears => "auricular rim",
            DefenseField::Endurance => "willpower",
            DefenseField::Volume => "vocal output",
        }
    }
}

/// Six-field defense-role vector. Every value lies in [0, 100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefenseVector {
    pub waist: u8,
    pub feet: u8,
    pub axilla: u8,
    pub ears: u8,
    pub endurance: u8,
    pub volume: u8,
}

impl DefenseVector {
    pub fn get(&self, field: DefenseField) -> u8 {
        match field {
            DefenseField::Waist => self.waist,
            DefenseField::Feet => self.feet,
            DefenseField::Axilla => self.axilla,
            DefenseField::Ears => self.ears,
            DefenseField::Endurance => self.endurance,
            DefenseField::Volume => self.volume,
        }
    }

    /// Values in canonical order.
    pub fn values(&self) -> [u8; 6] {
        DefenseField::ALL.map(|f| self.get(f))
    }

    /// Mean of the four sensitivity fields.
    pub fn sensitivity_mean(&self) -> f64 {
        let sum: u32 = DefenseField::SENSITIVITY
            .iter()
            .map(|f| u32::from(self.get(*f)))
            .sum();
        f64::from(sum) / 4.0
    }

    /// Most sensitive field; earliest in canonical order on ties.
    pub fn most_sensitive(&self) -> DefenseField {
        first_max(&DefenseField::SENSITIVITY, |f| self.get(*f))
    }

    fn draw(stream: &mut SeededStream) -> Self {
        // Struct-literal fields evaluate top to bottom: this is the draw order.
        Self {
            waist: stream.next_polarized(),
            feet: stream.next_polarized(),
            axilla: stream.next_polarized(),
            ears: stream.next_polarized(),
            endurance: stream.next_polarized(),
            volume: stream.next_polarized(),
        }
    }
}

// =============================================================================
// Attack layout
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackField {
    Technique,
    Control,
    Insight,
    Intensity,
    Stamina,
    Tools,
}

impl AttackField {
    /// Canonical draw order.
    pub const ALL: [AttackField; 6] = [
        AttackField::Technique,
        AttackField::Control,
        AttackField::Insight,
        AttackField::Intensity,
        AttackField::Stamina,
        AttackField::Tools,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            AttackField::Technique => "technique",
            AttackField::Control => "control",
            AttackField::Insight => "insight",
            AttackField::Intensity => "intensity",
            AttackField::Stamina => "stamina",
            AttackField::Tools => "tools",
        }
    }

    /// Style label used in versus narratives.
    pub fn label(&self) -> &'static str {
        match self {
            AttackField::Technique => "precision fingerwork",
            AttackField::Control => "commanding presence",
            AttackField::Insight => "weak-point insight",
            AttackField::Intensity => "relentless pressure",
            AttackField::Stamina => "war of attrition",
            AttackField::Tools => "instrument craft",
        }
    }
}

/// Six-field attack-role vector. Every value lies in [0, 100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackVector {
    pub technique: u8,
    pub control: u8,
    pub insight: u8,
    pub intensity: u8,
    pub stamina: u8,
    pub tools: u8,
}

impl AttackVector {
    pub fn get(&self, field: AttackField) -> u8 {
        match field {
            AttackField::Technique => self.technique,
            AttackField::Control => self.control,
            AttackField::Insight => self.insight,
            AttackField::Intensity => self.intensity,
            AttackField::Stamina => self.stamina,
            AttackField::Tools => self.tools,
        }
    }

    pub fn values(&self) -> [u8; 6] {
        AttackField::ALL.map(|f| self.get(f))
    }

    pub fn mean(&self) -> f64 {
        let sum: u32 = self.values().iter().map(|v| u32::from(*v)).sum();
        f64::from(sum) / 6.0
    }

    /// Strongest field; earliest in canonical order on ties.
    pub fn signature(&self) -> AttackField {
        first_max(&AttackField::ALL, |f| self.get(*f))
    }

    fn draw(stream: &mut SeededStream) -> Self {
        Self {
            technique: stream.next_polarized(),
            control: stream.next_polarized(),
            insight: stream.next_polarized(),
            intensity: stream.next_polarized(),
            stamina: stream.next_polarized(),
            tools: stream.next_polarized(),
        }
    }
}

// =============================================================================
// Role-tagged vector
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitVector {
    Defense(DefenseVector),
    Attack(AttackVector),
}

impl TraitVector {
    pub fn role(&self) -> Role {
        match self {
            TraitVector::Defense(_) => Role::Defense,
            TraitVector::Attack(_) => Role::Attack,
        }
    }

    pub fn values(&self) -> [u8; 6] {
        match self {
            TraitVector::Defense(v) => v.values(),
            TraitVector::Attack(v) => v.values(),
        }
    }

    pub fn as_defense(&self) -> Option<&DefenseVector> {
        match self {
            TraitVector::Defense(v) => Some(v),
            TraitVector::Attack(_) => None,
        }
    }

    pub fn as_attack(&self) -> Option<&AttackVector> {
        match self {
            TraitVector::Attack(v) => Some(v),
            TraitVector::Defense(_) => None,
        }
    }
}

/// Linear scan for the largest value; the first field wins ties.
pub(crate) fn first_max<F: Copy>(fields: &[F], value: impl Fn(&F) -> u8) -> F {
    let mut best = fields[0];
    let mut best_value = value(&best);
    for field in &fields[1..] {
        let v = value(field);
        if v > best_value {
            best = *field;
            best_value = v;
        }
    }
    best
}

// =============================================================================
// Generation
// =============================================================================

/// Seed used for the trait draws of `identifier` in `role`.
pub fn trait_seed(identifier: &str, salt: &str, role: Role) -> String {
    format!("{}{}{}", canonicalize(identifier), salt, role.seed_tag())
}

/// Generate the trait vector for an identifier in a role.
///
/// A fixed override for the same role is returned verbatim without building
/// a stream. Otherwise the override salt (if any) perturbs the seed.
pub fn generate(identifier: &str, role: Role, overrides: &OverrideTable) -> TraitVector {
    match role {
        Role::Defense => TraitVector::Defense(generate_defense(identifier, overrides)),
        Role::Attack => TraitVector::Attack(generate_attack(identifier, overrides)),
    }
}

pub fn generate_defense(identifier: &str, overrides: &OverrideTable) -> DefenseVector {
    let name = canonicalize(identifier);
    if let Some(TraitVector::Defense(fixed)) = overrides.fixed_for(name, Role::Defense) {
        return fixed;
    }
    DefenseVector::draw(&mut role_stream(name, Role::Defense, overrides))
}

pub fn generate_attack(identifier: &str, overrides: &OverrideTable) -> AttackVector {
    let name = canonicalize(identifier);
    if let Some(TraitVector::Attack(fixed)) = overrides.fixed_for(name, Role::Attack) {
        return fixed;
    }
    AttackVector::draw(&mut role_stream(name, Role::Attack, overrides))
}

fn role_stream(name: &str, role: Role, overrides: &OverrideTable) -> SeededStream {
    SeededStream::new(&trait_seed(name, overrides.salt_for(name), role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::overrides::Override;

    #[test]
    fn generation_is_deterministic() {
        let table = OverrideTable::default();
        for role in [Role::Defense, Role::Attack] {
            let a = generate("Subject-7", role, &table);
            let b = generate("Subject-7", role, &table);
            assert_eq!(a, b);
            assert_eq!(a.role(), role);
        }
    }

    #[test]
    fn identifiers_are_trimmed() {
        let table = OverrideTable::default();
        assert_eq!(
            generate("  Subject-7\t", Role::Defense, &table),
            generate("Subject-7", Role::Defense, &table)
        );
    }

    #[test]
    fn roles_use_distinct_streams() {
        let table = OverrideTable::default();
        let d = generate("Subject-7", Role::Defense, &table).values();
        let a = generate("Subject-7", Role::Attack, &table).values();
        assert_ne!(d, a);
    }

    #[test]
    fn fields_follow_stream_order() {
        let table = OverrideTable::default();
        let v = generate_defense("order-check", &table);
        let mut stream = SeededStream::new(&trait_seed("order-check", "", Role::Defense));
        let expected: Vec<u8> = (0..6).map(|_| stream.next_polarized()).collect();
        assert_eq!(v.values().to_vec(), expected);
    }

    #[test]
    fn values_stay_below_one_hundred() {
        let table = OverrideTable::default();
        for i in 0..500 {
            let name = format!("n{i}");
            for v in generate(&name, Role::Defense, &table).values() {
                assert!(v < 100);
            }
            for v in generate(&name, Role::Attack, &table).values() {
                assert!(v < 100);
            }
        }
    }

    #[test]
    fn fixed_override_is_returned_verbatim() {
        let fixed = DefenseVector {
            waist: 1,
            feet: 2,
            axilla: 3,
            ears: 4,
            endurance: 5,
            volume: 6,
        };
        let table = OverrideTable::from_entries([(
            "pinned".to_string(),
            Override::Fixed(TraitVector::Defense(fixed)),
        )])
        .unwrap();
        assert_eq!(generate_defense(" pinned ", &table), fixed);
        // The other role is not pinned and still draws from a stream.
        let unpinned = OverrideTable::default();
        assert_eq!(
            generate_attack("pinned", &table),
            generate_attack("pinned", &unpinned)
        );
    }

    #[test]
    fn salt_perturbs_seed() {
        let salted =
            OverrideTable::from_entries([("salted".to_string(), Override::Salt("_X".into()))])
                .unwrap();
        let plain = OverrideTable::default();
        assert_ne!(
            generate_defense("salted", &salted),
            generate_defense("salted", &plain)
        );
        assert_eq!(
            generate_defense("salted", &salted),
            generate_defense("salted_X", &plain)
        );
    }

    #[test]
    fn first_max_prefers_earliest_on_tie() {
        let v = DefenseVector {
            waist: 50,
            feet: 80,
            axilla: 80,
            ears: 80,
            endurance: 99,
            volume: 99,
        };
        assert_eq!(v.most_sensitive(), DefenseField::Feet);

        let a = AttackVector {
            technique: 10,
            control: 10,
            insight: 10,
            intensity: 10,
            stamina: 10,
            tools: 10,
        };
        assert_eq!(a.signature(), AttackField::Technique);
    }
}
