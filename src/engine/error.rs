//! Validation errors reported by the analysis engine.

use thiserror::Error;

use super::report::Mode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Identifier is empty or whitespace-only after trimming.
    #[error("invalid identifier: {reason}")]
    InvalidIdentifier { reason: &'static str },

    /// A two-identifier mode was invoked with only one usable name.
    #[error("missing second identifier for {mode} mode")]
    MissingSecondIdentifier { mode: Mode },
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier { .. } => "invalid_identifier",
            Self::MissingSecondIdentifier { .. } => "missing_second_identifier",
        }
    }
}
