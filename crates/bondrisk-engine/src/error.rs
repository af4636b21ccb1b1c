//! Engine error types.

use thiserror::Error;

use bondrisk_core::{ErrorKind, RiskError};
use bondrisk_traits::TraitError;

/// Engine error type.
///
/// Cache backend failures never appear here; the coordinator swallows them.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Validation, missing data or a guarded numeric fault from the analytics
    #[error(transparent)]
    Risk(#[from] RiskError),

    /// Entity not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Username/password pair did not resolve
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Entity already exists
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence or identity collaborator failure
    #[error("storage error: {0}")]
    Storage(String),

    /// CSV export failure
    #[error("export error: {0}")]
    Export(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// True for errors caused by the caller's input or missing data.
    pub fn is_client_error(&self) -> bool {
        match self {
            EngineError::Risk(e) => e.kind() != ErrorKind::Computation,
            EngineError::NotFound(_) | EngineError::InvalidCredentials | EngineError::Conflict(_) => {
                true
            }
            EngineError::Storage(_) | EngineError::Export(_) | EngineError::Config(_) => false,
        }
    }

    /// Shorthand for a validation failure.
    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::Risk(RiskError::invalid_argument(msg))
    }
}

impl From<TraitError> for EngineError {
    fn from(e: TraitError) -> Self {
        match e {
            TraitError::NotFound(what) => EngineError::NotFound(what),
            TraitError::AlreadyExists(what) => EngineError::Conflict(what),
            TraitError::InvalidInput(msg) => EngineError::invalid(msg),
            other => EngineError::Storage(other.to_string()),
        }
    }
}

impl From<csv::Error> for EngineError {
    fn from(e: csv::Error) -> Self {
        EngineError::Export(e.to_string())
    }
}
