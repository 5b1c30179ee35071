//! Error types of the KTD estimators.

use thiserror::Error;

/// Result of KTD operations.
pub type Result<T> = std::result::Result<T, KtdError>;

/// Errors raised by the KTD estimators.
///
/// None of these are recovered from internally. `NotPositiveDefinite` in particular means the filter has
/// diverged; the caller decides whether the experiment is restarted.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum KtdError {
    #[error("a positive definite matrix is required: {context}")]
    NotPositiveDefinite { context: &'static str },

    #[error("parameter size mismatch: expected {expected} parameters, got {found}")]
    ParameterSizeMismatch { expected: usize, found: usize },

    #[error("parameter buffer is empty")]
    EmptyParameters,

    #[error("bad {what} size: expected {expected}, got {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("the action set of a KTD-Q estimator must not be empty")]
    EmptyActionSet,

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("parameter buffer is borrowed by a reader during learn")]
    ParameterBufferBusy,

    #[error("malformed persisted state: {message}")]
    Parse { message: String },

    #[error("persisted state I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl KtdError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        KtdError::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        KtdError::Parse {
            message: message.into(),
        }
    }
}
