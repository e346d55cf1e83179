//! Bounded, severity-tagged alert log.

use chrono::{DateTime, Utc};
use lorekeep_common::collections::BoundedLog;
use lorekeep_common::error::{ErrorClassification, ErrorSeverity};
use lorekeep_domain::{Alert, AlertSeverity};
use parking_lot::Mutex;
use tracing::{error, warn};

/// FIFO alert log bounded to a fixed capacity.
///
/// Repeated conditions raise repeated alerts; nothing is de-duplicated.
/// High and Critical alerts are also written to the log synchronously.
pub struct AlertSink {
    log: Mutex<BoundedLog<Alert>>,
}

impl AlertSink {
    pub fn new(capacity: usize) -> Self {
        Self { log: Mutex::new(BoundedLog::new(capacity)) }
    }

    /// Append `alert`, evicting the oldest once full.
    pub fn raise(&self, alert: Alert) {
        match alert.severity {
            AlertSeverity::Critical => error!(
                alert_id = %alert.id,
                kind = %alert.kind,
                severity = %alert.severity,
                "{}", alert.message
            ),
            AlertSeverity::High => warn!(
                alert_id = %alert.id,
                kind = %alert.kind,
                severity = %alert.severity,
                "{}", alert.message
            ),
            AlertSeverity::Low | AlertSeverity::Medium => {}
        }

        self.log.lock().push(alert);
    }

    /// Up to `limit` alerts, newest first.
    pub fn recent(&self, limit: usize) -> Vec<Alert> {
        self.log.lock().newest_first(limit).into_iter().cloned().collect()
    }

    /// All retained alerts of exactly `level`, newest first.
    pub fn by_severity(&self, level: AlertSeverity) -> Vec<Alert> {
        self.log.lock().iter().rev().filter(|a| a.severity == level).cloned().collect()
    }

    /// Drop alerts raised before `older_than`. Returns how many were removed.
    pub fn sweep(&self, older_than: DateTime<Utc>) -> usize {
        self.log.lock().retain(|a| a.raised_at >= older_than)
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.log.lock().capacity()
    }
}

/// Alert severity for a classified error.
pub fn severity_for(err: &impl ErrorClassification) -> AlertSeverity {
    match err.severity() {
        ErrorSeverity::Info => AlertSeverity::Low,
        ErrorSeverity::Warning => AlertSeverity::Medium,
        ErrorSeverity::Error => AlertSeverity::High,
        ErrorSeverity::Critical => AlertSeverity::Critical,
    }
}
