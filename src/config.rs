//! Engine configuration: override table and rule thresholds.
//!
//! Loaded once at startup from a JSON file. Every section is optional and
//! falls back to the built-in defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::overrides::{Override, OverrideTable};
use crate::engine::{DiagnosisThresholds, RankThresholds, ResonanceThresholds, VersusConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub overrides: OverrideTable,
    pub rank: RankThresholds,
    pub diagnosis: DiagnosisThresholds,
    pub resonance: ResonanceThresholds,
    pub versus: VersusConfig,
}

impl EngineConfig {
    pub fn with_overrides(overrides: OverrideTable) -> Self {
        Self {
            overrides,
            ..Self::default()
        }
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rank.validate().map_err(ConfigError::Invalid)?;
        self.diagnosis.validate().map_err(ConfigError::Invalid)?;
        self.resonance.validate().map_err(ConfigError::Invalid)?;
        self.versus.validate().map_err(ConfigError::Invalid)?;
        validate_overrides(&self.overrides)
    }
}

fn validate_overrides(table: &OverrideTable) -> Result<(), ConfigError> {
    for (name, entry) in table.iter() {
        if name.is_empty() {
            return Err(ConfigError::Invalid(
                "override keys must be non-empty after trimming".to_string(),
            ));
        }
        if let Override::Fixed(vector) = entry {
            if let Some(v) = vector.values().iter().find(|v| **v >= 100) {
                return Err(ConfigError::Invalid(format!(
                    "fixed {} vector for {name:?} has value {v} outside 0..100",
                    vector.role().as_str()
                )));
            }
        }
    }
    Ok(())
}
