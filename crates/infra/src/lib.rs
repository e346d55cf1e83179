//! # Lorekeep Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - SQLite pool management (r2d2) implementing the monitoring ports
//! - The instrumented query executor
//! - Configuration loading (file + environment)
//! - Background schedulers for sampling and housekeeping
//!
//! ## Architecture
//! - Implements traits defined in `lorekeep-core`
//! - Contains all "impure" code (I/O, timers)

pub mod config;
pub mod database;
pub mod errors;
pub mod scheduling;

pub use database::{DbManager, InstrumentedExecutor, SqliteHealthProbe};
pub use errors::InfraError;
pub use scheduling::{
    HealthScheduler, MaintenanceConfig, MaintenanceScheduler, MaintenanceTasks, SchedulerError,
};
