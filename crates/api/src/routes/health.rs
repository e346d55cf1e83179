use axum::extract::State;
use axum::Json;
use lorekeep_domain::ConnectionHealthReport;

use crate::context::AppState;

/// Last published connection-pool health. Always 200; the gate answers 503
/// before this runs when the verdict is unhealthy.
pub(super) async fn connection_health(State(state): State<AppState>) -> Json<ConnectionHealthReport> {
    Json(state.hub.health.current().report())
}
