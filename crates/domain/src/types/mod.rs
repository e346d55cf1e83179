//! Domain types and models

pub mod alert;
pub mod health;
pub mod metrics;
pub mod rate_limit;

pub use alert::{Alert, AlertDetail, AlertKind, AlertSeverity, PerformanceMetric};
pub use health::{
    ConnectionHealthReport, ConnectionSnapshot, HealthState, HealthStatus, HealthVerdict,
    PoolCounts,
};
pub use metrics::{PerformanceSummary, QuerySample, QuerySuggestion};
pub use rate_limit::{RateLimitDecision, RateLimitWindow, RouteClass};
