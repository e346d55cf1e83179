//! Connection sampler: one liveness probe per tick, then classify and publish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lorekeep_common::error::ErrorClassification;
use lorekeep_common::time::{Clock, SystemClock};
use lorekeep_domain::constants::{DEFAULT_PROBE_TIMEOUT_MS, PROBE_FINGERPRINT};
use lorekeep_domain::{
    Alert, AlertDetail, AlertSeverity, ConnectionSnapshot, HealthState, HealthStatus,
    HealthThresholds, PerformanceMetric, QuerySample,
};
use tracing::{debug, error, info, warn};

use super::{severity_for, HealthClassifier, MonitorError, MonitoringHub};
use crate::health_ports::{DataStoreProbe, PoolStatsProvider};

/// Tunables for one sampler.
#[derive(Debug, Clone)]
pub struct SamplerSettings {
    /// Hard upper bound on one liveness probe.
    pub probe_timeout: Duration,
    pub thresholds: HealthThresholds,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            thresholds: HealthThresholds::default(),
        }
    }
}

/// Samples the data store and publishes the resulting [`HealthState`].
///
/// The sampler is the only writer of the published state.
pub struct ConnectionSampler {
    probe: Arc<dyn DataStoreProbe>,
    pool: Arc<dyn PoolStatsProvider>,
    hub: MonitoringHub,
    classifier: HealthClassifier,
    probe_timeout: Duration,
    clock: Arc<dyn Clock>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the tick finishes or is dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ConnectionSampler {
    pub fn new(
        probe: Arc<dyn DataStoreProbe>,
        pool: Arc<dyn PoolStatsProvider>,
        hub: MonitoringHub,
        settings: SamplerSettings,
    ) -> Self {
        Self::with_clock(probe, pool, hub, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        probe: Arc<dyn DataStoreProbe>,
        pool: Arc<dyn PoolStatsProvider>,
        hub: MonitoringHub,
        settings: SamplerSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            probe,
            pool,
            hub,
            classifier: HealthClassifier::new(settings.thresholds),
            probe_timeout: settings.probe_timeout,
            clock,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run a tick unless one is already in flight.
    ///
    /// Returns `None` when skipped.
    pub async fn try_tick(&self) -> Option<ConnectionSnapshot> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Previous sampler tick still in flight, skipping");
            return None;
        }
        let _guard = InFlightGuard(&self.in_flight);
        Some(self.sample_and_publish().await)
    }

    /// Run one tick, waiting for nothing but the probe.
    ///
    /// Concurrent callers are not serialized here; the scheduler uses
    /// [`try_tick`](Self::try_tick).
    pub async fn tick(&self) -> ConnectionSnapshot {
        self.sample_and_publish().await
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    async fn sample_and_publish(&self) -> ConnectionSnapshot {
        let probe = self.probe_once().await;
        let counts = self.pool.pool_counts();
        let snapshot = match probe {
            Ok(latency_ms) => {
                let captured_at = self.clock.utc_now();
                self.hub
                    .recorder
                    .record(QuerySample::succeeded(PROBE_FINGERPRINT, latency_ms, captured_at));
                ConnectionSnapshot::from_counts(counts, latency_ms, captured_at)
            }
            Err(err) => {
                let snapshot = ConnectionSnapshot::unknown(self.clock.utc_now());
                error!(
                    error = %err,
                    retryable = err.is_retryable(),
                    "Database liveness probe failed"
                );
                self.hub.alerts.raise(Alert::new(
                    severity_for(&err),
                    format!("Database liveness probe failed: {err}"),
                    AlertDetail::Connection {
                        status: HealthStatus::Unhealthy,
                        reasons: vec![err.to_string()],
                        snapshot: snapshot.clone(),
                    },
                    snapshot.captured_at,
                ));
                snapshot
            }
        };

        let recorder = &self.hub.recorder;
        let slow_threshold = recorder.slow_threshold_ms();
        let rolling_average_ms = recorder.rolling_average_ms();
        let slow_fraction = recorder.slow_fraction(slow_threshold);
        let verdict = self.classifier.evaluate(&snapshot, rolling_average_ms, slow_fraction);

        let state = HealthState {
            verdict,
            snapshot: snapshot.clone(),
            rolling_average_ms,
            pool_max_size: counts.max_size,
        };
        let previous = self.hub.health.publish(state.clone());

        self.raise_transition_alert(previous.verdict.status, &state);
        self.raise_aggregate_alerts(slow_fraction, slow_threshold);

        debug!(
            status = %state.verdict.status,
            total = snapshot.total,
            latency_ms = ?snapshot.probe_latency_ms,
            rolling_average_ms,
            "Health sample published"
        );
        snapshot
    }

    /// Probe with the hard timeout. Returns the round-trip time in ms.
    async fn probe_once(&self) -> Result<f64, MonitorError> {
        let started = self.clock.now();
        match tokio::time::timeout(self.probe_timeout, self.probe.ping()).await {
            Ok(Ok(())) => {
                let elapsed = self.clock.now().duration_since(started);
                Ok(elapsed.as_nanos() as f64 / 1_000_000.0)
            }
            Ok(Err(source)) => Err(MonitorError::ProbeFailed { source }),
            Err(_) => Err(MonitorError::ProbeTimedOut { timeout: self.probe_timeout }),
        }
    }

    fn raise_transition_alert(&self, previous: HealthStatus, state: &HealthState) {
        let current = state.verdict.status;
        if current == previous {
            return;
        }
        info!(from = %previous, to = %current, "Database health status changed");

        let severity = match current {
            HealthStatus::Degraded => AlertSeverity::High,
            // A failed probe has already raised its own Critical alert.
            HealthStatus::Unhealthy if !state.snapshot.probe_failed() => AlertSeverity::Critical,
            HealthStatus::Unhealthy | HealthStatus::Healthy => return,
        };

        self.hub.alerts.raise(Alert::new(
            severity,
            format!("Database health {current}: {}", state.verdict.reasons.join("; ")),
            AlertDetail::Connection {
                status: current,
                reasons: state.verdict.reasons.clone(),
                snapshot: state.snapshot.clone(),
            },
            state.verdict.evaluated_at,
        ));
    }

    fn raise_aggregate_alerts(&self, slow_fraction: f64, slow_threshold: f64) {
        let recorder = &self.hub.recorder;
        if recorder.is_empty() {
            return;
        }
        let t = self.classifier.thresholds();
        let now = self.clock.utc_now();

        let error_rate = recorder.error_rate();
        let error_severity = if error_rate > t.error_rate_critical {
            Some((AlertSeverity::High, t.error_rate_critical))
        } else if error_rate > t.error_rate_warning {
            Some((AlertSeverity::Medium, t.error_rate_warning))
        } else {
            None
        };
        if let Some((severity, threshold)) = error_severity {
            warn!(error_rate, threshold, "Query error rate above threshold");
            self.hub.alerts.raise(Alert::new(
                severity,
                format!("Query error rate {:.1}% exceeds {:.1}%", error_rate * 100.0, threshold * 100.0),
                AlertDetail::Error {
                    fingerprint: None,
                    error_text: None,
                    error_rate: Some(error_rate),
                    threshold: Some(threshold),
                },
                now,
            ));
        }

        if slow_fraction > t.slow_fraction_warning {
            self.hub.alerts.raise(Alert::new(
                AlertSeverity::Medium,
                format!(
                    "{:.1}% of queries slower than {slow_threshold}ms",
                    slow_fraction * 100.0
                ),
                AlertDetail::Performance {
                    metric: PerformanceMetric::SlowFraction,
                    fingerprint: None,
                    observed: slow_fraction,
                    threshold: t.slow_fraction_warning,
                },
                now,
            ));
        }
    }
}
