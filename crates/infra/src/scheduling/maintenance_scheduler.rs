//! Cron-driven housekeeping: alert retention and rate-limit window sweeps.
//!
//! Both sweeps are also callable directly through [`MaintenanceTasks`], which
//! is what the cron jobs invoke.

use std::sync::Arc;
use std::time::Duration;

use lorekeep_common::time::{Clock, SystemClock};
use lorekeep_core::{MonitoringHub, RateLimiterSet};
use lorekeep_domain::RetentionConfig;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the maintenance scheduler.
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Six-field cron expression for the alert sweep.
    pub alert_sweep_cron: String,
    /// Six-field cron expression for the window sweep.
    pub window_sweep_cron: String,
    /// Alerts older than this are dropped by the sweep.
    pub alert_retention: Duration,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
}

impl MaintenanceConfig {
    pub fn from_retention(retention: &RetentionConfig) -> Self {
        Self {
            alert_sweep_cron: retention.alert_sweep_cron.clone(),
            window_sweep_cron: retention.window_sweep_cron.clone(),
            alert_retention: Duration::from_secs(retention.alert_retention_secs),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self::from_retention(&RetentionConfig::default())
    }
}

/// The two sweeps, independent of any schedule.
#[derive(Clone)]
pub struct MaintenanceTasks {
    hub: MonitoringHub,
    limiters: Arc<RateLimiterSet>,
    alert_retention: Duration,
    clock: Arc<dyn Clock>,
}

impl MaintenanceTasks {
    pub fn new(hub: MonitoringHub, limiters: Arc<RateLimiterSet>, alert_retention: Duration) -> Self {
        Self::with_clock(hub, limiters, alert_retention, Arc::new(SystemClock))
    }

    /// Tasks using the retention window carried by `config`.
    pub fn from_config(
        hub: MonitoringHub,
        limiters: Arc<RateLimiterSet>,
        config: &MaintenanceConfig,
    ) -> Self {
        Self::new(hub, limiters, config.alert_retention)
    }

    pub fn alert_retention(&self) -> Duration {
        self.alert_retention
    }

    pub fn with_clock(
        hub: MonitoringHub,
        limiters: Arc<RateLimiterSet>,
        alert_retention: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { hub, limiters, alert_retention, clock }
    }

    /// Drop alerts raised before `now - alert_retention`. Returns how many.
    pub fn sweep_alerts(&self) -> usize {
        let retention = chrono::Duration::from_std(self.alert_retention)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        let cutoff = self
            .clock
            .utc_now()
            .checked_sub_signed(retention)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
        let removed = self.hub.alerts.sweep(cutoff);
        if removed > 0 {
            debug!(removed, %cutoff, "Swept expired alerts");
        }
        removed
    }

    /// Drop every expired rate-limit window. Returns how many.
    pub fn sweep_windows(&self) -> usize {
        let removed = self.limiters.sweep_expired(self.clock.utc_now());
        if removed > 0 {
            debug!(removed, "Swept expired rate-limit windows");
        }
        removed
    }
}

/// Runs [`MaintenanceTasks`] on cron schedules.
pub struct MaintenanceScheduler {
    config: MaintenanceConfig,
    tasks: MaintenanceTasks,
    scheduler: Option<JobScheduler>,
}

impl MaintenanceScheduler {
    pub fn new(config: MaintenanceConfig, tasks: MaintenanceTasks) -> Self {
        Self { config, tasks, scheduler: None }
    }

    pub fn tasks(&self) -> &MaintenanceTasks {
        &self.tasks
    }

    /// Register both jobs on a fresh cron scheduler and start it.
    ///
    /// # Errors
    /// `AlreadyRunning`, `JobRegistrationFailed` for a bad cron expression,
    /// or a creation, start or timeout failure.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let scheduler =
            JobScheduler::new().await.map_err(|source| SchedulerError::CreationFailed { source })?;

        let alert_tasks = self.tasks.clone();
        let alert_job = Job::new_async(self.config.alert_sweep_cron.as_str(), move |_id, _lock| {
            let tasks = alert_tasks.clone();
            Box::pin(async move {
                tasks.sweep_alerts();
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed { job: "alert_sweep", source })?;

        let window_tasks = self.tasks.clone();
        let window_job = Job::new_async(self.config.window_sweep_cron.as_str(), move |_id, _lock| {
            let tasks = window_tasks.clone();
            Box::pin(async move {
                tasks.sweep_windows();
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed { job: "window_sweep", source })?;

        for (name, job) in [("alert_sweep", alert_job), ("window_sweep", window_job)] {
            scheduler
                .add(job)
                .await
                .map_err(|source| SchedulerError::JobRegistrationFailed { job: name, source })?;
        }

        let start_timeout = self.config.start_timeout;
        tokio::time::timeout(start_timeout, scheduler.start())
            .await
            .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?
            .map_err(|source| SchedulerError::StartFailed { source })?;

        self.scheduler = Some(scheduler);
        info!(
            alert_sweep = %self.config.alert_sweep_cron,
            window_sweep = %self.config.window_sweep_cron,
            "Maintenance scheduler started"
        );
        Ok(())
    }

    /// Shut the cron scheduler down.
    ///
    /// # Errors
    /// `NotRunning`, or a stop or timeout failure.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(mut scheduler) = self.scheduler.take() else {
            return Err(SchedulerError::NotRunning);
        };

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, scheduler.shutdown())
            .await
            .map_err(|source| SchedulerError::Timeout { duration: stop_timeout, source })?
            .map_err(|source| SchedulerError::StopFailed { source })?;

        info!("Maintenance scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }
}

impl Drop for MaintenanceScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("MaintenanceScheduler dropped while running; jobs stop with the runtime");
        }
    }
}
