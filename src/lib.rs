#![forbid(unsafe_code)]

//! # tsap
//!
//! Deterministic trait-profile analysis.
//!
//! Every identifier maps to a reproducible six-field trait vector: the name
//! (plus an optional salt from the override table) seeds a pseudo-random
//! stream whose draws pass through a polarizing curve, so profiles cluster at
//! the extremes. Vectors are ranked into tiers, matched against an ordered
//! rule table for a diagnosis, and compared pairwise for synchrony
//! (two subjects) or dominance (attacker against defender).
//!
//! The engine is pure and synchronous. Narration is an optional async layer
//! that hands a finished report to an OpenAI-compatible completion service.

pub mod config;
pub mod engine;
pub mod gateway;
pub mod narrate;
pub mod prompts;

pub use config::{ConfigError, EngineConfig};
pub use engine::{AnalysisEngine, EngineError, Mode, Report};
pub use gateway::{Attribution, ChatGateway, ProviderGateway, UsageSink};
pub use narrate::{Narration, NarrationError, Narrator, NarratorConfig};
