//! Fixed-window rate limiting records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Counter for one client key within one fixed window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitWindow {
    pub key: String,
    pub count: u32,
    pub window_start: DateTime<Utc>,
    pub window_duration_ms: u64,
}

impl RateLimitWindow {
    /// Fresh window starting at `start` with this call counted.
    pub fn open(key: impl Into<String>, start: DateTime<Utc>, window_duration_ms: u64) -> Self {
        Self { key: key.into(), count: 1, window_start: start, window_duration_ms }
    }

    /// `window_start + window_duration_ms`, or `None` on overflow.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        let duration = Duration::try_milliseconds(i64::try_from(self.window_duration_ms).ok()?)?;
        self.window_start.checked_add_signed(duration)
    }

    /// A window has expired once `now >= reset_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.reset_at().map_or(true, |reset| now >= reset)
    }
}

/// Outcome of one limiter check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Whole seconds until `reset_at`, rounded up, never below 1.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds().max(0);
        let secs = u64::try_from(millis).unwrap_or(0).div_ceil(1_000);
        secs.max(1)
    }
}

/// Route class, each with its own independently configured limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteClass {
    Api,
    Health,
    Auth,
}

impl_domain_status_conversions!(RouteClass {
    Api => "api",
    Health => "health",
    Auth => "auth",
});

impl RouteClass {
    /// Classify a request path. Health and metrics endpoints share the
    /// health budget; everything under `/auth` uses the auth budget.
    pub fn for_path(path: &str) -> Self {
        if path == "/health" || path.starts_with("/health/") || path.starts_with("/metrics") {
            Self::Health
        } else if path == "/auth" || path.starts_with("/auth/") {
            Self::Auth
        } else {
            Self::Api
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_expires_exactly_at_reset() {
        let start = Utc::now();
        let window = RateLimitWindow::open("10.0.0.1", start, 60_000);
        let reset = window.reset_at().expect("reset in range");

        assert_eq!(reset, start + Duration::milliseconds(60_000));
        assert!(!window.is_expired(reset - Duration::milliseconds(1)));
        assert!(window.is_expired(reset));
    }

    #[test]
    fn retry_after_rounds_up_and_never_zero() {
        let now = Utc::now();
        let decision = RateLimitDecision {
            allowed: false,
            limit: 5,
            remaining: 0,
            reset_at: now + Duration::milliseconds(1_200),
        };
        assert_eq!(decision.retry_after_secs(now), 2);
        assert_eq!(decision.retry_after_secs(now + Duration::seconds(10)), 1);
    }

    #[test]
    fn route_class_from_path() {
        assert_eq!(RouteClass::for_path("/health"), RouteClass::Health);
        assert_eq!(RouteClass::for_path("/metrics/alerts"), RouteClass::Health);
        assert_eq!(RouteClass::for_path("/auth/login"), RouteClass::Auth);
        assert_eq!(RouteClass::for_path("/api/v1/status"), RouteClass::Api);
        assert_eq!(RouteClass::for_path("/healthcheck"), RouteClass::Api);
    }
}
