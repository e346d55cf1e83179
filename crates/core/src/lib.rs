//! # Lorekeep Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Health monitoring: metric recorder, classifier, alert sink, sampler
//! - Per-client fixed-window rate limiting
//! - The request gate composing both in front of business logic
//! - Port interfaces (traits) for the data store
//!
//! ## Architecture Principles
//! - Only depends on `lorekeep-common` and `lorekeep-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod gate;
pub mod health_ports;
pub mod monitoring;
pub mod rate_limit;

pub use gate::{
    Admission, GateHeaders, GateRejection, PendingCompletion, RequestGate, ResponseSink,
    ServiceUnavailableBody, TooManyRequestsBody,
};
pub use health_ports::{DataStoreProbe, PoolStatsProvider};
pub use monitoring::{
    AlertSink, ConnectionSampler, HealthClassifier, HealthMonitor, MetricRecorder, MonitorError,
    MonitoringHub, SamplerSettings,
};
pub use rate_limit::{ClientIdentity, KeyExtractor, LimiterError, RateLimiter, RateLimiterSet};
