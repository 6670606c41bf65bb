//! Domain errors for Proofsync.
//!
//! Engines never surface these: they degrade to empty or no-op results.
//! Errors only cross the boundary calls into external collaborators.

use thiserror::Error;

/// Errors reported by external collaborators.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Context unavailable for {file_key}: {reason}")]
    ContextUnavailable { file_key: String, reason: String },

    #[error("Goal hints unavailable for {0}")]
    HintsUnavailable(String),

    #[error("Tactic execution failed: {0}")]
    ExecutionFailed(String),

    #[error("State store error: {0}")]
    StateError(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
