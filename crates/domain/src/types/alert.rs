//! Alert records
//!
//! Each alert carries a tagged [`AlertDetail`] whose variant determines the
//! alert kind, so consumers never have to inspect an untyped payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_domain_status_conversions;
use crate::types::health::{ConnectionSnapshot, HealthStatus};

/// Alert category, derived from the detail variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Performance,
    Connection,
    Error,
}

impl_domain_status_conversions!(AlertKind {
    Performance => "performance",
    Connection => "connection",
    Error => "error",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl_domain_status_conversions!(AlertSeverity {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

impl AlertSeverity {
    /// High and Critical alerts are written to the log when raised.
    pub fn is_logged(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// What a performance alert measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMetric {
    /// Duration of a single operation, in ms.
    QueryDuration,
    /// Fraction of retained samples slower than the slow threshold.
    SlowFraction,
}

/// Fixed-schema alert context, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AlertDetail {
    #[serde(rename_all = "camelCase")]
    Performance {
        metric: PerformanceMetric,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fingerprint: Option<String>,
        observed: f64,
        threshold: f64,
    },
    #[serde(rename_all = "camelCase")]
    Connection {
        status: HealthStatus,
        reasons: Vec<String>,
        snapshot: ConnectionSnapshot,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fingerprint: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_rate: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threshold: Option<f64>,
    },
}

impl AlertDetail {
    pub fn kind(&self) -> AlertKind {
        match self {
            Self::Performance { .. } => AlertKind::Performance,
            Self::Connection { .. } => AlertKind::Connection,
            Self::Error { .. } => AlertKind::Error,
        }
    }
}

/// A raised alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    pub context: AlertDetail,
}

impl Alert {
    pub fn new(
        severity: AlertSeverity,
        message: impl Into<String>,
        context: AlertDetail,
        raised_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind: context.kind(),
            severity,
            message: message.into(),
            raised_at,
            context,
        }
    }
}
