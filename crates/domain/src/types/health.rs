//! Connection snapshots and health verdicts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::UNKNOWN_CONNECTION_TOTAL;
use crate::impl_domain_status_conversions;

/// Raw connection-pool counts read from the data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolCounts {
    pub active: u32,
    pub idle: u32,
    pub waiting: u32,
    pub max_size: u32,
}

impl PoolCounts {
    /// Open connections, checked out or idle.
    pub fn total(&self) -> u32 {
        self.active.saturating_add(self.idle)
    }
}

/// Connection state captured by one sampler tick.
///
/// A failed probe yields `total == -1` and `stale == true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSnapshot {
    pub active: i64,
    pub idle: i64,
    pub total: i64,
    pub waiting: i64,
    /// Round-trip time of the liveness probe. `None` when the probe failed.
    pub probe_latency_ms: Option<f64>,
    pub stale: bool,
    pub captured_at: DateTime<Utc>,
}

impl ConnectionSnapshot {
    /// Snapshot from a successful probe.
    pub fn from_counts(counts: PoolCounts, probe_latency_ms: f64, captured_at: DateTime<Utc>) -> Self {
        Self {
            active: i64::from(counts.active),
            idle: i64::from(counts.idle),
            total: i64::from(counts.total()),
            waiting: i64::from(counts.waiting),
            probe_latency_ms: Some(probe_latency_ms.max(0.0)),
            stale: false,
            captured_at,
        }
    }

    /// Snapshot recorded when the probe failed or timed out.
    pub fn unknown(captured_at: DateTime<Utc>) -> Self {
        Self {
            active: 0,
            idle: 0,
            total: UNKNOWN_CONNECTION_TOTAL,
            waiting: 0,
            probe_latency_ms: None,
            stale: true,
            captured_at,
        }
    }

    /// Placeholder published before the first tick completes.
    pub fn pending(captured_at: DateTime<Utc>) -> Self {
        Self {
            active: 0,
            idle: 0,
            total: 0,
            waiting: 0,
            probe_latency_ms: None,
            stale: true,
            captured_at,
        }
    }

    pub fn probe_failed(&self) -> bool {
        self.total == UNKNOWN_CONNECTION_TOTAL
    }
}

/// Tri-state health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl_domain_status_conversions!(HealthStatus {
    Healthy => "healthy",
    Degraded => "degraded",
    Unhealthy => "unhealthy",
});

/// Result of classifying one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthVerdict {
    pub status: HealthStatus,
    /// Every threshold that fired, in evaluation order.
    pub reasons: Vec<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl HealthVerdict {
    pub fn healthy(evaluated_at: DateTime<Utc>) -> Self {
        Self { status: HealthStatus::Healthy, reasons: Vec::new(), evaluated_at }
    }
}

/// The verdict and the snapshot it was computed from, published together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthState {
    pub verdict: HealthVerdict,
    pub snapshot: ConnectionSnapshot,
    pub rolling_average_ms: f64,
    pub pool_max_size: u32,
}

impl HealthState {
    /// State before the first sampler tick: healthy, with a stale snapshot.
    pub fn initial(at: DateTime<Utc>) -> Self {
        Self {
            verdict: HealthVerdict::healthy(at),
            snapshot: ConnectionSnapshot::pending(at),
            rolling_average_ms: 0.0,
            pool_max_size: 0,
        }
    }

    /// Share of the pool's maximum size that is checked out. 0 when unknown.
    pub fn utilization(&self) -> f64 {
        if self.pool_max_size == 0 || self.snapshot.probe_failed() {
            return 0.0;
        }
        self.snapshot.active.max(0) as f64 / f64::from(self.pool_max_size)
    }

    /// Pool health object served to operators.
    pub fn report(&self) -> ConnectionHealthReport {
        ConnectionHealthReport {
            status: self.verdict.status,
            reasons: self.verdict.reasons.clone(),
            snapshot: self.snapshot.clone(),
            rolling_average_ms: self.rolling_average_ms,
            utilization: self.utilization(),
            evaluated_at: self.verdict.evaluated_at,
        }
    }
}

/// Connection-pool health object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHealthReport {
    pub status: HealthStatus,
    pub reasons: Vec<String>,
    pub snapshot: ConnectionSnapshot,
    pub rolling_average_ms: f64,
    pub utilization: f64,
    pub evaluated_at: DateTime<Utc>,
}
