use std::sync::Arc;

use lorekeep_core::{MonitoringHub, PoolStatsProvider, RequestGate};
use lorekeep_infra::InstrumentedExecutor;

/// Cheaply cloneable handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub gate: RequestGate,
    pub hub: MonitoringHub,
    pub executor: InstrumentedExecutor,
    /// Live pool counts for `/metrics/connections`.
    pub pool: Arc<dyn PoolStatsProvider>,
}
