//! Error types for the tracking core.

use thiserror::Error;

/// Errors raised by the tracking core.
///
/// Only [`TrackingError::InvalidConfig`] is fatal; the other kinds are
/// recovered from inside a frame cycle and logged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed detection: {0}")]
    MalformedDetection(String),

    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),
}

/// Result alias for tracking operations.
pub type Result<T> = std::result::Result<T, TrackingError>;
