//! Database health monitoring
//!
//! - [`MetricRecorder`]: bounded query sample log with rolling aggregates
//! - [`HealthClassifier`]: pure threshold cascade producing a verdict
//! - [`AlertSink`]: bounded, severity-tagged alert log
//! - [`HealthMonitor`]: lock-free published health state
//! - [`ConnectionSampler`]: periodic probe that feeds all of the above
//! - [`advisor`]: advisory query-pattern checks

pub mod advisor;
pub mod alerts;
pub mod classifier;
pub mod error;
pub mod fingerprint;
pub mod hub;
pub mod recorder;
pub mod sampler;
pub mod state;

pub use alerts::{severity_for, AlertSink};
pub use classifier::HealthClassifier;
pub use error::MonitorError;
pub use fingerprint::fingerprint;
pub use hub::MonitoringHub;
pub use recorder::MetricRecorder;
pub use sampler::{ConnectionSampler, SamplerSettings};
pub use state::HealthMonitor;
