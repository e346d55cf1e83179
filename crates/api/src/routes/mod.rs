//! Router and handlers.
//!
//! Every route sits behind the request gate; the gate classifies the path
//! into its rate-limit budget.

mod auth;
mod error;
mod health;
mod metrics;
mod status;

use axum::routing::{get, post};
use axum::{middleware, Router};

pub use error::ApiError;

use crate::context::AppState;
use crate::middleware::request_gate;

/// Build the application router with the gate installed in front of every
/// route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::connection_health))
        .route("/metrics/performance", get(metrics::performance))
        .route("/metrics/alerts", get(metrics::alerts))
        .route("/metrics/connections", get(metrics::connections))
        .route("/metrics/suggestions", get(metrics::suggestions))
        .route("/auth/{*procedure}", post(auth::not_implemented))
        .route("/api/v1/status", get(status::status))
        .layer(middleware::from_fn_with_state(state.clone(), request_gate))
        .with_state(state)
}
