//! Published health state: one writer, many readers.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use lorekeep_domain::{HealthState, HealthStatus};

/// Holds the most recent [`HealthState`].
///
/// The sampler publishes a whole new state per tick; request handlers load
/// the current `Arc` without locking and never observe a partial update.
pub struct HealthMonitor {
    current: ArcSwap<HealthState>,
}

impl HealthMonitor {
    pub fn new(initial: HealthState) -> Self {
        Self { current: ArcSwap::from_pointee(initial) }
    }

    /// Monitor starting in [`HealthState::initial`].
    pub fn starting_at(at: DateTime<Utc>) -> Self {
        Self::new(HealthState::initial(at))
    }

    /// Current state. Lock-free.
    pub fn current(&self) -> Arc<HealthState> {
        self.current.load_full()
    }

    pub fn status(&self) -> HealthStatus {
        self.current.load().verdict.status
    }

    /// Replace the state, returning the previous one.
    pub fn publish(&self, state: HealthState) -> Arc<HealthState> {
        self.current.swap(Arc::new(state))
    }
}

#[cfg(test)]
mod tests {
    use lorekeep_domain::{ConnectionSnapshot, HealthVerdict};

    use super::*;

    #[test]
    fn publish_replaces_state_wholesale() {
        let now = Utc::now();
        let monitor = HealthMonitor::starting_at(now);
        assert_eq!(monitor.status(), HealthStatus::Healthy);

        let held = monitor.current();
        let previous = monitor.publish(HealthState {
            verdict: HealthVerdict {
                status: HealthStatus::Unhealthy,
                reasons: vec!["database probe failed".into()],
                evaluated_at: now,
            },
            snapshot: ConnectionSnapshot::unknown(now),
            rolling_average_ms: 0.0,
            pool_max_size: 10,
        });

        assert_eq!(previous.verdict.status, HealthStatus::Healthy);
        assert_eq!(monitor.status(), HealthStatus::Unhealthy);
        // Readers holding the old Arc keep a consistent view.
        assert_eq!(held.verdict.status, HealthStatus::Healthy);
        assert!(monitor.current().snapshot.probe_failed());
    }
}
