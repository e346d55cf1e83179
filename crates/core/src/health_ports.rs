//! Data-store ports consumed by the connection sampler.
//!
//! The sampler needs two things from the data store: a cheap liveness probe
//! and the live connection-pool counts. Infrastructure provides both.
//!
//! # Example
//!
//! ```no_run
//! use lorekeep_core::{DataStoreProbe, PoolStatsProvider};
//!
//! async fn probe_once(store: &(impl DataStoreProbe + PoolStatsProvider)) {
//!     if store.ping().await.is_ok() {
//!         let counts = store.pool_counts();
//!         println!("{} active / {} idle", counts.active, counts.idle);
//!     }
//! }
//! ```

use async_trait::async_trait;
use lorekeep_domain::{PoolCounts, Result};

/// Minimal round-trip against the data store.
///
/// Implementations must not retry. The sampler applies the timeout and
/// treats any error as a probe failure.
#[async_trait]
pub trait DataStoreProbe: Send + Sync {
    /// Issue one liveness query (e.g. `SELECT 1`).
    async fn ping(&self) -> Result<()>;
}

/// Live connection-pool counts.
///
/// Reading counts must be cheap and non-blocking; it runs on every tick.
pub trait PoolStatsProvider: Send + Sync {
    fn pool_counts(&self) -> PoolCounts;
}
