use lorekeep_common::error::{ErrorClassification, ErrorSeverity};
use thiserror::Error;

/// Internal limiter failures.
///
/// The request gate fails open on every variant: the request is served
/// without limiting and the failure is logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimiterError {
    #[error("No client key could be derived from the request")]
    MissingKey,

    #[error("Window reset time for key '{key}' is out of range")]
    WindowOverflow { key: String },

    #[error("Invalid rate limit rule: {message}")]
    InvalidRule { message: String },
}

impl ErrorClassification for LimiterError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidRule { .. } => ErrorSeverity::Error,
            Self::MissingKey | Self::WindowOverflow { .. } => ErrorSeverity::Warning,
        }
    }
}
