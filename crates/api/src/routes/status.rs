use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::ApiError;
use crate::context::AppState;

const TABLE_COUNT_SQL: &str = "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StatusBody {
    status: &'static str,
    tables: i64,
    health: lorekeep_domain::HealthStatus,
}

/// Demo business route: one instrumented query against the store.
pub(super) async fn status(State(state): State<AppState>) -> Result<Json<StatusBody>, ApiError> {
    let tables = state.executor.query_i64(TABLE_COUNT_SQL).await?;
    Ok(Json(StatusBody { status: "ok", tables, health: state.hub.health.status() }))
}
