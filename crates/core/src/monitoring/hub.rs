//! Shared monitoring state handed to the sampler, the gate and the
//! instrumented executor.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lorekeep_domain::{
    Alert, AlertDetail, AlertSeverity, PerformanceMetric, QuerySample, RetentionConfig,
};
use tracing::debug;

use super::{AlertSink, HealthMonitor, MetricRecorder};

/// Cloneable bundle of the recorder, the alert sink and the published
/// health state.
#[derive(Clone)]
pub struct MonitoringHub {
    pub recorder: Arc<MetricRecorder>,
    pub alerts: Arc<AlertSink>,
    pub health: Arc<HealthMonitor>,
}

impl MonitoringHub {
    pub fn new(
        metric_capacity: usize,
        alert_capacity: usize,
        slow_query_ms: f64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            recorder: Arc::new(MetricRecorder::new(metric_capacity, slow_query_ms)),
            alerts: Arc::new(AlertSink::new(alert_capacity)),
            health: Arc::new(HealthMonitor::starting_at(started_at)),
        }
    }

    pub fn from_retention(
        retention: &RetentionConfig,
        slow_query_ms: f64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self::new(retention.metric_capacity, retention.alert_capacity, slow_query_ms, started_at)
    }

    /// Record one completed operation and raise per-operation alerts.
    ///
    /// A failed operation raises a Medium error alert. A successful one
    /// slower than the slow threshold raises a Low performance alert.
    pub fn report_operation(&self, sample: QuerySample) {
        let threshold = self.recorder.slow_threshold_ms();

        if !sample.success {
            debug!(fingerprint = %sample.fingerprint, "operation failed");
            self.alerts.raise(Alert::new(
                AlertSeverity::Medium,
                format!("Operation failed: {}", sample.fingerprint),
                AlertDetail::Error {
                    fingerprint: Some(sample.fingerprint.clone()),
                    error_text: sample.error_text.clone(),
                    error_rate: None,
                    threshold: None,
                },
                sample.captured_at,
            ));
        } else if sample.is_slow(threshold) {
            self.alerts.raise(Alert::new(
                AlertSeverity::Low,
                format!("Slow operation ({:.2}ms): {}", sample.duration_ms, sample.fingerprint),
                AlertDetail::Performance {
                    metric: PerformanceMetric::QueryDuration,
                    fingerprint: Some(sample.fingerprint.clone()),
                    observed: sample.duration_ms,
                    threshold,
                },
                sample.captured_at,
            ));
        }

        self.recorder.record(sample);
    }
}

#[cfg(test)]
mod tests {
    use lorekeep_domain::AlertKind;

    use super::*;

    #[test]
    fn failures_and_slow_operations_raise_alerts() {
        let hub = MonitoringHub::new(10, 10, 100.0, Utc::now());

        hub.report_operation(QuerySample::succeeded("SELECT ?", 5.0, Utc::now()));
        assert!(hub.alerts.is_empty());

        hub.report_operation(QuerySample::succeeded("SELECT ?", 250.0, Utc::now()));
        hub.report_operation(QuerySample::failed("DELETE FROM t", 1.0, "locked", Utc::now()));

        let alerts = hub.alerts.recent(10);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind, AlertKind::Error);
        assert_eq!(alerts[0].severity, AlertSeverity::Medium);
        assert_eq!(alerts[1].kind, AlertKind::Performance);
        assert_eq!(alerts[1].severity, AlertSeverity::Low);
        assert_eq!(hub.recorder.len(), 3);
    }
}
