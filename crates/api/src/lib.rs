//! # Lorekeep API
//!
//! HTTP application layer - routes, request gate and entry point.
//!
//! This crate contains:
//! - The axum router and introspection endpoints
//! - The request-gate middleware (rate limit, then health verdict)
//! - Application context (dependency injection)
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires up the layered architecture
//! - Owns process lifecycle: startup, background schedulers, shutdown

pub mod context;
pub mod middleware;
pub mod routes;
pub mod utils;

pub use context::{AppContext, AppState};
pub use routes::router;
