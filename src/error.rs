//! Error types for the valuation engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the engine to its callers.
///
/// The engine is deterministic, so no error is retryable: `NotFound` means
/// the referenced entity does not exist, `Config` means an input invariant
/// was violated, and `ScenarioConflict` means an override referenced a
/// phase or member that is not present in its target.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Referenced asset, snapshot, or portfolio id does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Input invariant violated; never silently repaired
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Override references a phase or member not present in the target
    #[error("scenario conflict: {0}")]
    ScenarioConflict(String),
}

/// A non-fatal numeric degeneracy encountered during evaluation.
///
/// Attached to the result rather than raised: the engine substitutes a
/// defined value (e.g. `0` for the unadjusted NPV when the terminal PoS
/// is zero) and records what happened here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericWarning {
    pub message: String,
}

impl NumericWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
