//! Configuration management
//!
//! Every section defaults independently, so a config file only needs the
//! keys it overrides.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ALERT_CAPACITY, DEFAULT_ALERT_RETENTION_SECS, DEFAULT_ALERT_SWEEP_CRON,
    DEFAULT_API_RATE_LIMIT, DEFAULT_AUTH_RATE_LIMIT, DEFAULT_DEGRADED_AVG_QUERY_MS,
    DEFAULT_DEGRADED_CONNECTIONS, DEFAULT_DEGRADED_LATENCY_MS, DEFAULT_ERROR_RATE_CRITICAL,
    DEFAULT_ERROR_RATE_WARNING, DEFAULT_HEALTH_RATE_LIMIT, DEFAULT_METRIC_CAPACITY,
    DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_SAMPLING_INTERVAL_SECS, DEFAULT_SLOW_FRACTION_WARNING,
    DEFAULT_SLOW_QUERY_MS, DEFAULT_UNHEALTHY_CONNECTIONS, DEFAULT_UNHEALTHY_LATENCY_MS,
    DEFAULT_WINDOW_SWEEP_CRON,
};
use crate::errors::{LorekeepError, Result};
use crate::impl_domain_status_conversions;
use crate::types::rate_limit::RouteClass;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub monitor: MonitorConfig,
    pub thresholds: HealthThresholds,
    pub retention: RetentionConfig,
    pub rate_limits: RateLimitsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1:4000".to_string() }
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub pool_size: u32,
    pub connection_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("lorekeep.db"), pool_size: 10, connection_timeout_ms: 5_000 }
    }
}

/// Connection sampler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub sampling_interval_secs: u64,
    pub probe_timeout_ms: u64,
    /// Operations slower than this count as slow and raise a Low alert.
    pub slow_query_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sampling_interval_secs: DEFAULT_SAMPLING_INTERVAL_SECS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            slow_query_ms: DEFAULT_SLOW_QUERY_MS,
        }
    }
}

/// Classification and alerting thresholds.
///
/// These are policy defaults, not invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    pub degraded_latency_ms: f64,
    pub unhealthy_latency_ms: f64,
    pub degraded_connections: i64,
    pub unhealthy_connections: i64,
    pub degraded_avg_query_ms: f64,
    /// When set, a slow-sample fraction above this also degrades health.
    pub degraded_slow_fraction: Option<f64>,
    pub error_rate_warning: f64,
    pub error_rate_critical: f64,
    pub slow_fraction_warning: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            degraded_latency_ms: DEFAULT_DEGRADED_LATENCY_MS,
            unhealthy_latency_ms: DEFAULT_UNHEALTHY_LATENCY_MS,
            degraded_connections: DEFAULT_DEGRADED_CONNECTIONS,
            unhealthy_connections: DEFAULT_UNHEALTHY_CONNECTIONS,
            degraded_avg_query_ms: DEFAULT_DEGRADED_AVG_QUERY_MS,
            degraded_slow_fraction: None,
            error_rate_warning: DEFAULT_ERROR_RATE_WARNING,
            error_rate_critical: DEFAULT_ERROR_RATE_CRITICAL,
            slow_fraction_warning: DEFAULT_SLOW_FRACTION_WARNING,
        }
    }
}

/// Bounded-log capacities and periodic sweeps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub metric_capacity: usize,
    pub alert_capacity: usize,
    pub alert_retention_secs: u64,
    /// Six-field cron expression for the alert retention sweep.
    pub alert_sweep_cron: String,
    /// Six-field cron expression for expired rate-limit window collection.
    pub window_sweep_cron: String,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            metric_capacity: DEFAULT_METRIC_CAPACITY,
            alert_capacity: DEFAULT_ALERT_CAPACITY,
            alert_retention_secs: DEFAULT_ALERT_RETENTION_SECS,
            alert_sweep_cron: DEFAULT_ALERT_SWEEP_CRON.to_string(),
            window_sweep_cron: DEFAULT_WINDOW_SWEEP_CRON.to_string(),
        }
    }
}

/// Cap and window for one route class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub max_requests: u32,
    pub window_ms: u64,
}

impl RateLimitRule {
    pub const fn new(max_requests: u32, window_ms: u64) -> Self {
        Self { max_requests, window_ms }
    }
}

impl std::str::FromStr for RateLimitRule {
    type Err = LorekeepError;

    /// Parses `max/window_ms`, e.g. `100/60000`.
    fn from_str(s: &str) -> Result<Self> {
        let (max, window) = s.split_once('/').ok_or_else(|| {
            LorekeepError::Config(format!("Rate limit must be <max>/<window_ms>: {s}"))
        })?;
        let max_requests = max
            .trim()
            .parse::<u32>()
            .map_err(|e| LorekeepError::Config(format!("Invalid rate limit cap '{max}': {e}")))?;
        let window_ms = window
            .trim()
            .parse::<u64>()
            .map_err(|e| LorekeepError::Config(format!("Invalid rate limit window '{window}': {e}")))?;
        Ok(Self { max_requests, window_ms })
    }
}

/// How a client key is derived from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Network address only.
    #[default]
    Address,
    /// Network address combined with the user agent.
    AddressAgent,
}

impl_domain_status_conversions!(KeyStrategy {
    Address => "address",
    AddressAgent => "address_agent",
});

/// Per-route-class limiter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitsConfig {
    pub api: RateLimitRule,
    pub health: RateLimitRule,
    pub auth: RateLimitRule,
    pub key_strategy: KeyStrategy,
}

impl RateLimitsConfig {
    pub fn rule_for(&self, class: RouteClass) -> RateLimitRule {
        match class {
            RouteClass::Api => self.api,
            RouteClass::Health => self.health,
            RouteClass::Auth => self.auth,
        }
    }
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            api: RateLimitRule::new(DEFAULT_API_RATE_LIMIT.0, DEFAULT_API_RATE_LIMIT.1),
            health: RateLimitRule::new(DEFAULT_HEALTH_RATE_LIMIT.0, DEFAULT_HEALTH_RATE_LIMIT.1),
            auth: RateLimitRule::new(DEFAULT_AUTH_RATE_LIMIT.0, DEFAULT_AUTH_RATE_LIMIT.1),
            key_strategy: KeyStrategy::Address,
        }
    }
}

impl Config {
    /// Reject configurations the monitor cannot run with.
    ///
    /// # Errors
    /// Returns `LorekeepError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(LorekeepError::Config(msg.to_string()));

        if self.database.pool_size == 0 {
            return invalid("database.pool_size must be greater than 0");
        }
        if self.monitor.sampling_interval_secs == 0 {
            return invalid("monitor.sampling_interval_secs must be greater than 0");
        }
        if self.monitor.probe_timeout_ms == 0 {
            return invalid("monitor.probe_timeout_ms must be greater than 0");
        }
        if self.retention.metric_capacity == 0 {
            return invalid("retention.metric_capacity must be greater than 0");
        }
        if self.retention.alert_capacity == 0 {
            return invalid("retention.alert_capacity must be greater than 0");
        }
        for class in [RouteClass::Api, RouteClass::Health, RouteClass::Auth] {
            let rule = self.rate_limits.rule_for(class);
            if rule.max_requests == 0 || rule.window_ms == 0 {
                return Err(LorekeepError::Config(format!(
                    "rate_limits.{class} must have a non-zero cap and window"
                )));
            }
        }

        let t = &self.thresholds;
        if t.degraded_latency_ms > t.unhealthy_latency_ms {
            return invalid("thresholds.degraded_latency_ms exceeds unhealthy_latency_ms");
        }
        if t.degraded_connections > t.unhealthy_connections {
            return invalid("thresholds.degraded_connections exceeds unhealthy_connections");
        }
        if t.error_rate_warning > t.error_rate_critical {
            return invalid("thresholds.error_rate_warning exceeds error_rate_critical");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rate_limits.api, RateLimitRule::new(100, 60_000));
        assert_eq!(config.rate_limits.auth, RateLimitRule::new(5, 900_000));
        assert_eq!(config.retention.metric_capacity, 1_000);
        assert_eq!(config.retention.alert_capacity, 100);
    }

    #[test]
    fn validate_rejects_inverted_thresholds() {
        let mut config = Config::default();
        config.thresholds.degraded_connections = 90;
        let err = config.validate().expect_err("inverted thresholds");
        assert!(err.to_string().contains("degraded_connections"));
    }

    #[test]
    fn validate_rejects_zero_window() {
        let mut config = Config::default();
        config.rate_limits.health = RateLimitRule::new(10, 0);
        let err = config.validate().expect_err("zero window");
        assert!(err.to_string().contains("rate_limits.health"));
    }

    #[test]
    fn rule_parses_cap_and_window() {
        let rule: RateLimitRule = "25 / 30000".parse().expect("valid rule");
        assert_eq!(rule, RateLimitRule::new(25, 30_000));
        assert!("25".parse::<RateLimitRule>().is_err());
        assert!("x/1".parse::<RateLimitRule>().is_err());
    }

    #[test]
    fn key_strategy_parses_alongside_crate_result_alias() {
        // This module has the crate's one-parameter `Result` in scope.
        let strategy: KeyStrategy = " Address_Agent ".parse().expect("valid strategy");
        assert_eq!(strategy, KeyStrategy::AddressAgent);
        assert_eq!(strategy.to_string(), "address_agent");

        let err = "bogus".parse::<KeyStrategy>().expect_err("unknown strategy");
        assert_eq!(err, "Invalid KeyStrategy: bogus");
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: Config = toml::from_str(
            "[monitor]\nsampling_interval_secs = 5\n\n[rate_limits.api]\nmax_requests = 3\nwindow_ms = 1000\n",
        )
        .expect("parse partial toml");
        assert_eq!(config.monitor.sampling_interval_secs, 5);
        assert_eq!(config.monitor.probe_timeout_ms, 5_000);
        assert_eq!(config.rate_limits.api, RateLimitRule::new(3, 1_000));
        assert_eq!(config.rate_limits.health, RateLimitRule::new(10, 60_000));
    }
}
