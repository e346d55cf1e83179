//! Shared test helpers for `lorekeep-core` integration tests.
//!
//! An in-memory data store whose probe outcome and pool counts can be
//! changed between sampler ticks.

use std::sync::Arc;

use async_trait::async_trait;
use lorekeep_common::time::MockClock;
use lorekeep_core::{DataStoreProbe, PoolStatsProvider};
use lorekeep_domain::{LorekeepError, PoolCounts, Result as DomainResult};
use parking_lot::Mutex;

/// Scriptable stand-in for the database.
#[derive(Clone)]
pub struct ScriptedStore {
    clock: MockClock,
    latency_ms: u64,
    counts: Arc<Mutex<PoolCounts>>,
    failing: Arc<Mutex<bool>>,
}

impl ScriptedStore {
    pub fn new(clock: MockClock, latency_ms: u64) -> Self {
        Self {
            clock,
            latency_ms,
            counts: Arc::new(Mutex::new(PoolCounts { active: 1, idle: 4, waiting: 0, max_size: 10 })),
            failing: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set_counts(&self, active: u32, idle: u32, max_size: u32) {
        *self.counts.lock() = PoolCounts { active, idle, waiting: 0, max_size };
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }
}

#[async_trait]
impl DataStoreProbe for ScriptedStore {
    async fn ping(&self) -> DomainResult<()> {
        self.clock.advance_millis(self.latency_ms);
        if *self.failing.lock() {
            return Err(LorekeepError::Database("connection refused".into()));
        }
        Ok(())
    }
}

impl PoolStatsProvider for ScriptedStore {
    fn pool_counts(&self) -> PoolCounts {
        *self.counts.lock()
    }
}
