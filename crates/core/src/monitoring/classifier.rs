//! Threshold cascade turning a snapshot into a health verdict.
//!
//! [`HealthClassifier::evaluate`] is pure. It reads only its arguments and the
//! thresholds it was built with, so it can be tested against synthetic
//! snapshots.

use lorekeep_domain::{ConnectionSnapshot, HealthStatus, HealthThresholds, HealthVerdict};

#[derive(Debug, Clone, Default)]
pub struct HealthClassifier {
    thresholds: HealthThresholds,
}

impl HealthClassifier {
    pub fn new(thresholds: HealthThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &HealthThresholds {
        &self.thresholds
    }

    /// Classify `snapshot` together with the recorder's aggregates.
    ///
    /// Unhealthy checks run first, then degraded checks. Every check that
    /// fires adds a reason in that order, so a measurement past its unhealthy
    /// threshold is listed twice. The verdict is stamped with the snapshot's
    /// capture time.
    pub fn evaluate(
        &self,
        snapshot: &ConnectionSnapshot,
        rolling_avg_ms: f64,
        slow_fraction: f64,
    ) -> HealthVerdict {
        let t = &self.thresholds;
        let mut reasons = Vec::new();
        let mut unhealthy = false;
        let mut degraded = false;

        let probe_failed = snapshot.probe_failed();
        let latency = snapshot.probe_latency_ms;

        // Unhealthy cascade
        if probe_failed {
            unhealthy = true;
            reasons.push("database probe failed: connection status unknown".to_string());
        }
        if let Some(ms) = latency.filter(|ms| *ms > t.unhealthy_latency_ms) {
            unhealthy = true;
            reasons.push(format!(
                "probe latency {ms:.2}ms exceeds unhealthy threshold {}ms",
                t.unhealthy_latency_ms
            ));
        }
        if !probe_failed && snapshot.total > t.unhealthy_connections {
            unhealthy = true;
            reasons.push(format!(
                "total connections {} exceed unhealthy threshold {}",
                snapshot.total, t.unhealthy_connections
            ));
        }

        // Degraded cascade
        if let Some(ms) = latency.filter(|ms| *ms > t.degraded_latency_ms) {
            degraded = true;
            reasons.push(format!(
                "probe latency {ms:.2}ms exceeds degraded threshold {}ms",
                t.degraded_latency_ms
            ));
        }
        if !probe_failed && snapshot.total > t.degraded_connections {
            degraded = true;
            reasons.push(format!(
                "total connections {} exceed degraded threshold {}",
                snapshot.total, t.degraded_connections
            ));
        }
        if rolling_avg_ms > t.degraded_avg_query_ms {
            degraded = true;
            reasons.push(format!(
                "rolling average query time {rolling_avg_ms:.2}ms exceeds {}ms",
                t.degraded_avg_query_ms
            ));
        }
        if let Some(limit) = t.degraded_slow_fraction {
            if slow_fraction > limit {
                degraded = true;
                reasons.push(format!(
                    "slow query fraction {:.1}% exceeds {:.1}%",
                    slow_fraction * 100.0,
                    limit * 100.0
                ));
            }
        }

        let status = if unhealthy {
            HealthStatus::Unhealthy
        } else if degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthVerdict { status, reasons, evaluated_at: snapshot.captured_at }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use lorekeep_domain::PoolCounts;

    use super::*;

    fn snapshot(active: u32, idle: u32, latency: f64) -> ConnectionSnapshot {
        ConnectionSnapshot::from_counts(
            PoolCounts { active, idle, waiting: 0, max_size: 100 },
            latency,
            Utc::now(),
        )
    }

    fn classifier() -> HealthClassifier {
        HealthClassifier::new(HealthThresholds::default())
    }

    #[test]
    fn quiet_pool_is_healthy() {
        let verdict = classifier().evaluate(&snapshot(2, 3, 1.5), 20.0, 0.0);
        assert_eq!(verdict.status, HealthStatus::Healthy);
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn probe_failure_is_unhealthy_regardless_of_aggregates() {
        let verdict = classifier().evaluate(&ConnectionSnapshot::unknown(Utc::now()), 0.0, 0.0);
        assert_eq!(verdict.status, HealthStatus::Unhealthy);
        assert_eq!(verdict.reasons.len(), 1);
        assert!(verdict.reasons[0].contains("probe failed"));
    }

    #[test]
    fn too_many_connections_is_unhealthy() {
        let verdict = classifier().evaluate(&snapshot(90, 5, 1.0), 0.0, 0.0);
        assert_eq!(verdict.status, HealthStatus::Unhealthy);
        assert_eq!(verdict.reasons.len(), 2);
        assert!(verdict.reasons[0].contains("unhealthy threshold 80"));
        assert!(verdict.reasons[1].contains("degraded threshold 60"));
    }

    #[test]
    fn connections_at_boundary_use_strict_comparison() {
        let at_unhealthy = classifier().evaluate(&snapshot(80, 0, 1.0), 0.0, 0.0);
        assert_eq!(at_unhealthy.status, HealthStatus::Degraded);

        let at_degraded = classifier().evaluate(&snapshot(60, 0, 1.0), 0.0, 0.0);
        assert_eq!(at_degraded.status, HealthStatus::Healthy);
    }

    #[test]
    fn slow_probe_degrades_then_fails() {
        let degraded = classifier().evaluate(&snapshot(1, 1, 1_500.0), 0.0, 0.0);
        assert_eq!(degraded.status, HealthStatus::Degraded);
        assert!(degraded.reasons[0].contains("probe latency 1500.00ms"));

        let unhealthy = classifier().evaluate(&snapshot(1, 1, 6_000.0), 0.0, 0.0);
        assert_eq!(unhealthy.status, HealthStatus::Unhealthy);
        assert_eq!(
            unhealthy.reasons,
            vec![
                "probe latency 6000.00ms exceeds unhealthy threshold 5000ms".to_string(),
                "probe latency 6000.00ms exceeds degraded threshold 1000ms".to_string(),
            ]
        );
    }

    #[test]
    fn reasons_accumulate_in_check_order() {
        let verdict = classifier().evaluate(&snapshot(85, 0, 2_000.0), 750.0, 0.0);
        assert_eq!(verdict.status, HealthStatus::Unhealthy);
        assert_eq!(verdict.reasons.len(), 4);
        assert!(verdict.reasons[0].contains("connections 85 exceed unhealthy"));
        assert!(verdict.reasons[1].contains("probe latency"));
        assert!(verdict.reasons[2].contains("connections 85 exceed degraded"));
        assert!(verdict.reasons[3].contains("rolling average"));
    }

    #[test]
    fn slow_fraction_only_degrades_when_configured() {
        let snap = snapshot(1, 1, 1.0);
        assert_eq!(classifier().evaluate(&snap, 0.0, 0.9).status, HealthStatus::Healthy);

        let strict = HealthClassifier::new(HealthThresholds {
            degraded_slow_fraction: Some(0.25),
            ..HealthThresholds::default()
        });
        let verdict = strict.evaluate(&snap, 0.0, 0.5);
        assert_eq!(verdict.status, HealthStatus::Degraded);
        assert!(verdict.reasons[0].contains("slow query fraction"));
    }

    #[test]
    fn connections_between_thresholds_never_silently_healthy() {
        for total in 61..=80 {
            let verdict = classifier().evaluate(&snapshot(total, 0, 10.0), 0.0, 0.0);
            assert_ne!(verdict.status, HealthStatus::Healthy, "total={total}");
        }
    }
}
