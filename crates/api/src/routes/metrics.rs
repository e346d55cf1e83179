//! Read-only introspection over the monitoring hub.

use axum::extract::{Query, State};
use axum::Json;
use lorekeep_core::monitoring::advisor;
use lorekeep_domain::constants::DEFAULT_ALERT_LIST_LIMIT;
use lorekeep_domain::{
    Alert, AlertSeverity, ConnectionSnapshot, LorekeepError, PerformanceSummary, PoolCounts,
    QuerySuggestion,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::context::AppState;

pub(super) async fn performance(State(state): State<AppState>) -> Json<PerformanceSummary> {
    Json(state.hub.recorder.summary())
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct AlertQuery {
    severity: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct AlertListing {
    count: usize,
    alerts: Vec<Alert>,
}

/// Retained alerts, newest first, optionally filtered to one severity.
pub(super) async fn alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<AlertListing>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_ALERT_LIST_LIMIT);
    let alerts = match query.severity.as_deref() {
        Some(raw) => {
            let level: AlertSeverity = raw.parse().map_err(LorekeepError::InvalidInput)?;
            let mut matching = state.hub.alerts.by_severity(level);
            matching.truncate(limit);
            matching
        }
        None => state.hub.alerts.recent(limit),
    };
    Ok(Json(AlertListing { count: alerts.len(), alerts }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ConnectionsView {
    snapshot: ConnectionSnapshot,
    pool: PoolCounts,
    utilization: f64,
}

/// Last sampled snapshot next to the live pool counts.
pub(super) async fn connections(State(state): State<AppState>) -> Json<ConnectionsView> {
    let current = state.hub.health.current();
    Json(ConnectionsView {
        snapshot: current.snapshot.clone(),
        pool: state.pool.pool_counts(),
        utilization: current.utilization(),
    })
}

pub(super) async fn suggestions(State(state): State<AppState>) -> Json<Vec<QuerySuggestion>> {
    let recorder = &state.hub.recorder;
    let samples = recorder.snapshot(recorder.capacity());
    Json(advisor::suggest(&samples, recorder.slow_threshold_ms()))
}
