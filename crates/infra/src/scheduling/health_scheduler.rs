//! Interval loop driving the connection sampler.
//!
//! The first tick fires immediately on start, then every `interval`. Ticks
//! that fall due while a probe is still running are skipped rather than
//! queued. Stopping cancels the loop and abandons any in-flight probe.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use lorekeep_core::ConnectionSampler;
//! use lorekeep_infra::scheduling::{HealthScheduler, SchedulerResult};
//!
//! # async fn example(sampler: Arc<ConnectionSampler>) -> SchedulerResult<()> {
//! let mut scheduler = HealthScheduler::new(sampler, Duration::from_secs(30));
//! scheduler.start()?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use lorekeep_core::ConnectionSampler;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the sampler's background task.
pub struct HealthScheduler {
    sampler: Arc<ConnectionSampler>,
    interval: Duration,
    join_timeout: Duration,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl HealthScheduler {
    pub fn new(sampler: Arc<ConnectionSampler>, interval: Duration) -> Self {
        Self {
            sampler,
            interval,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Spawn the sampling loop.
    ///
    /// # Errors
    /// `AlreadyRunning` if the loop is active.
    #[instrument(skip(self), fields(interval = ?self.interval))]
    pub fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();
        let cancel = self.cancellation.clone();
        let sampler = Arc::clone(&self.sampler);
        let interval = self.interval;

        self.task_handle = Some(tokio::spawn(async move {
            Self::sample_loop(sampler, interval, cancel).await;
        }));

        info!("Health scheduler started");
        Ok(())
    }

    /// Cancel the loop and wait for it to exit.
    ///
    /// # Errors
    /// `NotRunning` if the loop was never started, `Timeout` or
    /// `TaskJoinFailed` if the task does not exit cleanly.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(handle) = self.task_handle.take() else {
            return Err(SchedulerError::NotRunning);
        };

        self.cancellation.cancel();

        let join_timeout = self.join_timeout;
        tokio::time::timeout(join_timeout, handle)
            .await
            .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;

        info!("Health scheduler stopped");
        Ok(())
    }

    /// Returns true while the loop task is alive.
    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn sample_loop(
        sampler: Arc<ConnectionSampler>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Health sampling loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!("Abandoning in-flight probe on shutdown");
                            break;
                        }
                        snapshot = sampler.try_tick() => {
                            if snapshot.is_none() {
                                debug!("Sampler tick skipped");
                            }
                        }
                    }
                }
            }
        }
    }
}

impl Drop for HealthScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("HealthScheduler dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use lorekeep_core::{DataStoreProbe, MonitoringHub, PoolStatsProvider, SamplerSettings};
    use lorekeep_domain::{PoolCounts, Result as DomainResult};

    use super::*;

    struct InstantStore;

    #[async_trait]
    impl DataStoreProbe for InstantStore {
        async fn ping(&self) -> DomainResult<()> {
            Ok(())
        }
    }

    impl PoolStatsProvider for InstantStore {
        fn pool_counts(&self) -> PoolCounts {
            PoolCounts { active: 1, idle: 1, waiting: 0, max_size: 4 }
        }
    }

    struct StuckStore;

    #[async_trait]
    impl DataStoreProbe for StuckStore {
        async fn ping(&self) -> DomainResult<()> {
            std::future::pending().await
        }
    }

    impl PoolStatsProvider for StuckStore {
        fn pool_counts(&self) -> PoolCounts {
            PoolCounts::default()
        }
    }

    fn sampler<S>(store: S, hub: &MonitoringHub) -> Arc<ConnectionSampler>
    where
        S: DataStoreProbe + PoolStatsProvider + 'static,
    {
        let store = Arc::new(store);
        Arc::new(ConnectionSampler::new(
            Arc::clone(&store) as Arc<dyn DataStoreProbe>,
            store,
            hub.clone(),
            SamplerSettings { probe_timeout: Duration::from_secs(60), ..Default::default() },
        ))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn first_tick_fires_immediately() {
        let hub = MonitoringHub::new(100, 100, 1_000.0, Utc::now());
        let mut scheduler = HealthScheduler::new(sampler(InstantStore, &hub), Duration::from_secs(3600));

        scheduler.start().expect("start succeeds");
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop().await.expect("stop succeeds");

        let state = hub.health.current();
        assert!(!state.snapshot.stale);
        assert_eq!(state.snapshot.total, 2);
        assert_eq!(hub.recorder.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_is_rejected() {
        let hub = MonitoringHub::new(10, 10, 1_000.0, Utc::now());
        let mut scheduler = HealthScheduler::new(sampler(InstantStore, &hub), Duration::from_secs(1));

        scheduler.start().expect("first start");
        let err = scheduler.start().expect_err("second start fails");
        assert!(matches!(err, SchedulerError::AlreadyRunning));
        scheduler.stop().await.expect("stop succeeds");
        assert!(!scheduler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_abandons_stuck_probe() {
        let hub = MonitoringHub::new(10, 10, 1_000.0, Utc::now());
        let sampler = sampler(StuckStore, &hub);
        let mut scheduler = HealthScheduler::new(Arc::clone(&sampler), Duration::from_secs(1));

        scheduler.start().expect("start succeeds");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sampler.is_in_flight());

        scheduler.stop().await.expect("stop returns despite stuck probe");
        assert!(!sampler.is_in_flight());
        assert!(hub.health.current().snapshot.stale);
    }

    #[tokio::test]
    async fn stop_without_start_is_an_error() {
        let hub = MonitoringHub::new(10, 10, 1_000.0, Utc::now());
        let mut scheduler = HealthScheduler::new(sampler(InstantStore, &hub), Duration::from_secs(1));
        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));
    }
}
