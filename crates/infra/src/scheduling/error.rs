//! Scheduler error types

use std::time::Duration;

use lorekeep_domain::LorekeepError;
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;
use tokio_cron_scheduler::JobSchedulerError;

use crate::errors::InfraError;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is already running
    #[error("Scheduler already running")]
    AlreadyRunning,

    /// Scheduler is not running
    #[error("Scheduler not running")]
    NotRunning,

    /// Failed to create the cron scheduler
    #[error("Failed to create scheduler: {source}")]
    CreationFailed {
        #[source]
        source: JobSchedulerError,
    },

    /// Failed to start the cron scheduler
    #[error("Failed to start scheduler: {source}")]
    StartFailed {
        #[source]
        source: JobSchedulerError,
    },

    /// Failed to shut the cron scheduler down
    #[error("Failed to stop scheduler: {source}")]
    StopFailed {
        #[source]
        source: JobSchedulerError,
    },

    /// A job's cron expression was rejected or the job could not be added
    #[error("Failed to register job '{job}': {source}")]
    JobRegistrationFailed {
        job: &'static str,
        #[source]
        source: JobSchedulerError,
    },

    /// Operation timed out
    #[error("Operation timed out after {duration:?}")]
    Timeout {
        duration: Duration,
        #[source]
        source: Elapsed,
    },

    /// Background task panicked or was aborted
    #[error("Task join failed: {0}")]
    TaskJoinFailed(#[from] JoinError),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let domain = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                LorekeepError::InvalidInput(err.to_string())
            }
            SchedulerError::JobRegistrationFailed { .. } => LorekeepError::Config(err.to_string()),
            SchedulerError::Timeout { .. } => LorekeepError::Timeout(err.to_string()),
            _ => LorekeepError::Internal(err.to_string()),
        };
        InfraError(domain)
    }
}

impl From<SchedulerError> for LorekeepError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
