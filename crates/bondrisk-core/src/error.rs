//! Error types for risk calculations.
//!
//! Every failure the analytics can produce falls into one of three
//! [`ErrorKind`]s. Callers decide how to surface an error from its kind alone;
//! none of these are retried.

use thiserror::Error;

/// A specialized Result type for analytics operations.
pub type CoreResult<T> = Result<T, RiskError>;

/// Broad classification of a [`RiskError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input rejected before any computation ran.
    Validation,
    /// The data needed for the computation is missing or empty.
    DataUnavailable,
    /// A numeric guard tripped during computation.
    Computation,
}

/// Errors that can occur during valuation and risk calculations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RiskError {
    /// The curve cannot be used for discounting.
    #[error("invalid curve: {0}")]
    InvalidCurve(String),

    /// An argument is outside its allowed domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Not enough data to produce the requested metric.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A numeric guard rejected the computation.
    #[error("computation fault: {0}")]
    Computation(String),
}

impl RiskError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RiskError::InvalidCurve(_) | RiskError::InvalidArgument(_) => ErrorKind::Validation,
            RiskError::InsufficientData(_) => ErrorKind::DataUnavailable,
            RiskError::Computation(_) => ErrorKind::Computation,
        }
    }

    /// Shorthand for [`RiskError::InvalidCurve`].
    pub fn invalid_curve(msg: impl Into<String>) -> Self {
        RiskError::InvalidCurve(msg.into())
    }

    /// Shorthand for [`RiskError::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        RiskError::InvalidArgument(msg.into())
    }

    /// Shorthand for [`RiskError::InsufficientData`].
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        RiskError::InsufficientData(msg.into())
    }

    /// Shorthand for [`RiskError::Computation`].
    pub fn computation(msg: impl Into<String>) -> Self {
        RiskError::Computation(msg.into())
    }
}
