use std::time::Duration;

use lorekeep_common::error::{ErrorClassification, ErrorSeverity};
use lorekeep_domain::LorekeepError;
use thiserror::Error;

/// Failures inside the monitoring pipeline.
///
/// None of these reach request handlers. A probe failure becomes an
/// unknown snapshot plus a Critical alert.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Liveness probe failed: {source}")]
    ProbeFailed {
        #[source]
        source: LorekeepError,
    },

    #[error("Liveness probe timed out after {timeout:?}")]
    ProbeTimedOut { timeout: Duration },
}

impl ErrorClassification for MonitorError {
    fn is_retryable(&self) -> bool {
        true
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Critical
    }
}

impl From<MonitorError> for LorekeepError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::ProbeFailed { source } => source,
            MonitorError::ProbeTimedOut { timeout } => {
                Self::Timeout(format!("liveness probe after {timeout:?}"))
            }
        }
    }
}
