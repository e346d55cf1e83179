//! Specialized data structures
//!
//! - [`bounded_log`]: capacity-bounded FIFO log that reports evictions

pub mod bounded_log;

pub use bounded_log::BoundedLog;
