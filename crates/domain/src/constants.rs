//! Domain constants
//!
//! Threshold values here are policy defaults. Deployments override them
//! through [`crate::config::HealthThresholds`].

/// `ConnectionSnapshot::total` value meaning the probe failed.
pub const UNKNOWN_CONNECTION_TOTAL: i64 = -1;

/// Maximum length of a query fingerprint, in characters.
pub const FINGERPRINT_MAX_LEN: usize = 100;

/// Fingerprint recorded for the sampler's synthetic liveness probe.
pub const PROBE_FINGERPRINT: &str = "SELECT 1";

// Capacities
pub const DEFAULT_METRIC_CAPACITY: usize = 1_000;
pub const DEFAULT_ALERT_CAPACITY: usize = 100;

// Sampler
pub const DEFAULT_SAMPLING_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_SLOW_QUERY_MS: u64 = 1_000;

// Health thresholds
pub const DEFAULT_DEGRADED_LATENCY_MS: f64 = 1_000.0;
pub const DEFAULT_UNHEALTHY_LATENCY_MS: f64 = 5_000.0;
pub const DEFAULT_DEGRADED_CONNECTIONS: i64 = 60;
pub const DEFAULT_UNHEALTHY_CONNECTIONS: i64 = 80;
pub const DEFAULT_DEGRADED_AVG_QUERY_MS: f64 = 500.0;
pub const DEFAULT_ERROR_RATE_WARNING: f64 = 0.05;
pub const DEFAULT_ERROR_RATE_CRITICAL: f64 = 0.10;
pub const DEFAULT_SLOW_FRACTION_WARNING: f64 = 0.10;

// Alert retention
pub const DEFAULT_ALERT_RETENTION_SECS: u64 = 86_400;
pub const DEFAULT_ALERT_SWEEP_CRON: &str = "0 0 * * * *";
pub const DEFAULT_WINDOW_SWEEP_CRON: &str = "0 * * * * *";

// Rate limits (max requests, window in ms)
pub const DEFAULT_API_RATE_LIMIT: (u32, u64) = (100, 60_000);
pub const DEFAULT_HEALTH_RATE_LIMIT: (u32, u64) = (10, 60_000);
pub const DEFAULT_AUTH_RATE_LIMIT: (u32, u64) = (5, 900_000);

// Alert listing
pub const DEFAULT_ALERT_LIST_LIMIT: usize = 50;
