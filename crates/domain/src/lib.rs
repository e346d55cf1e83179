//! # Lorekeep Domain
//!
//! Data types for database health monitoring and request gating.
//!
//! This crate contains:
//! - Query samples, connection snapshots, verdicts, alerts, rate-limit windows
//! - Domain error types and Result definitions
//! - Configuration structures with policy defaults
//!
//! ## Architecture
//! - No dependencies on other Lorekeep crates
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
