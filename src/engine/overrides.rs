//! Per-identifier overrides applied before trait generation.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::traits::{canonicalize, Role, TraitVector};

/// What to do for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Override {
    /// Skip generation for the vector's role and return it as-is.
    Fixed(TraitVector),
    /// Append to the seed before drawing.
    Salt(String),
}

/// Immutable identifier → override mapping, keyed by canonical identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Override>",
    into = "BTreeMap<String, Override>"
)]
pub struct OverrideTable {
    entries: BTreeMap<String, Override>,
}

impl OverrideTable {
    /// Fails when two keys canonicalize to the same identifier.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, Override)>,
    ) -> Result<Self, String> {
        let mut table = BTreeMap::new();
        for (name, value) in entries {
            match table.entry(canonicalize(&name).to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
                Entry::Occupied(slot) => {
                    return Err(format!(
                        "override key {name:?} duplicates {:?} after trimming",
                        slot.key()
                    ));
                }
            }
        }
        Ok(Self { entries: table })
    }

    pub fn get(&self, identifier: &str) -> Option<&Override> {
        self.entries.get(canonicalize(identifier))
    }

    /// Fixed vector for `identifier`, only if it was declared for `role`.
    pub fn fixed_for(&self, identifier: &str, role: Role) -> Option<TraitVector> {
        match self.get(identifier) {
            Some(Override::Fixed(v)) if v.role() == role => Some(*v),
            _ => None,
        }
    }

    /// Seed salt for `identifier`; empty when none is configured.
    pub fn salt_for(&self, identifier: &str) -> &str {
        match self.get(identifier) {
            Some(Override::Salt(salt)) => salt,
            _ => "",
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Override)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl TryFrom<BTreeMap<String, Override>> for OverrideTable {
    type Error = String;

    fn try_from(entries: BTreeMap<String, Override>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<OverrideTable> for BTreeMap<String, Override> {
    fn from(table: OverrideTable) -> Self {
        table.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::traits::AttackVector;

    #[test]
    fn parses_salt_and_fixed_entries() {
        let raw = r#"{
            "  Ganyu ": { "salt": "_SALT_COCO_V2" },
            "pinned": { "fixed": { "attack": {
                "technique": 90, "control": 10, "insight": 20,
                "intensity": 30, "stamina": 40, "tools": 50
            } } }
        }"#;
        let table: OverrideTable = serde_json::from_str(raw).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.salt_for("Ganyu"), "_SALT_COCO_V2");
        assert_eq!(table.salt_for("pinned"), "");
        assert_eq!(table.salt_for("unknown"), "");

        let fixed = table.fixed_for("pinned", Role::Attack).unwrap();
        assert_eq!(
            fixed.as_attack().copied(),
            Some(AttackVector {
                technique: 90,
                control: 10,
                insight: 20,
                intensity: 30,
                stamina: 40,
                tools: 50,
            })
        );
        assert!(table.fixed_for("pinned", Role::Defense).is_none());
    }

    #[test]
    fn lookups_canonicalize() {
        let table =
            OverrideTable::from_entries([("a".to_string(), Override::Salt("s".into()))]).unwrap();
        assert_eq!(table.salt_for("  a  "), "s");
    }

    #[test]
    fn keys_that_trim_alike_are_rejected() {
        let err = OverrideTable::from_entries([
            ("Orin".to_string(), Override::Salt("_A".into())),
            (" Orin ".to_string(), Override::Salt("_B".into())),
        ])
        .unwrap_err();
        assert!(err.contains("Orin"), "{err}");

        let raw = r#"{ "Orin": { "salt": "_A" }, " Orin ": { "salt": "_B" } }"#;
        assert!(serde_json::from_str::<OverrideTable>(raw).is_err());
    }
}
