//! Background task scheduling
//!
//! - [`HealthScheduler`]: fixed-interval loop driving the connection sampler
//! - [`MaintenanceScheduler`]: cron jobs for alert retention and rate-limit
//!   window sweeps
//!
//! Both expose explicit `start`/`stop` lifecycles and cancel their work on
//! drop.

pub mod error;
pub mod health_scheduler;
pub mod maintenance_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use health_scheduler::HealthScheduler;
pub use maintenance_scheduler::{MaintenanceConfig, MaintenanceScheduler, MaintenanceTasks};
