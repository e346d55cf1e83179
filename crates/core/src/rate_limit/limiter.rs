//! Per-key fixed-window request counter.
//!
//! Each client key owns one [`RateLimitWindow`]. A window is created lazily
//! on the key's first request, incremented while it is live, and replaced
//! wholesale once `now >= window_start + window_duration_ms`.
//!
//! Windows live in a sharded [`DashMap`]. Every check goes through the
//! entry API, which holds the shard's write lock for the whole
//! read-modify-write, so two concurrent checks for one key can never both
//! observe a passing count.
//!
//! State is process-local. Several instances behind a load balancer each
//! enforce their own budget.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lorekeep_domain::{RateLimitDecision, RateLimitRule, RateLimitWindow};
use tracing::debug;

use super::LimiterError;

/// Fixed-window limiter for one route class.
///
/// # Examples
///
/// ```rust
/// use chrono::Utc;
/// use lorekeep_core::rate_limit::RateLimiter;
/// use lorekeep_domain::RateLimitRule;
///
/// # fn main() -> Result<(), lorekeep_core::rate_limit::LimiterError> {
/// let limiter = RateLimiter::new(RateLimitRule::new(2, 60_000))?;
/// let now = Utc::now();
///
/// assert!(limiter.check("10.0.0.1", now)?.allowed);
/// assert!(limiter.check("10.0.0.1", now)?.allowed);
/// let third = limiter.check("10.0.0.1", now)?;
/// assert!(!third.allowed);
/// assert_eq!(third.remaining, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    rule: RateLimitRule,
    windows: DashMap<String, RateLimitWindow>,
}

impl RateLimiter {
    /// # Errors
    /// Returns `LimiterError::InvalidRule` for a zero cap or zero window.
    pub fn new(rule: RateLimitRule) -> Result<Self, LimiterError> {
        if rule.max_requests == 0 {
            return Err(LimiterError::InvalidRule {
                message: "max_requests must be greater than 0".to_string(),
            });
        }
        if rule.window_ms == 0 {
            return Err(LimiterError::InvalidRule {
                message: "window_ms must be greater than 0".to_string(),
            });
        }
        Ok(Self { rule, windows: DashMap::new() })
    }

    pub fn rule(&self) -> RateLimitRule {
        self.rule
    }

    /// Count this request against `key` and decide whether it may proceed.
    ///
    /// The call itself counts, including when it is rejected.
    ///
    /// # Errors
    /// `MissingKey` for an empty key, `WindowOverflow` when the reset time
    /// cannot be represented.
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> Result<RateLimitDecision, LimiterError> {
        if key.is_empty() {
            return Err(LimiterError::MissingKey);
        }

        let window_ms = self.rule.window_ms;
        match self.windows.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let window = occupied.get_mut();
                if window.is_expired(now) {
                    // Never move a window's start backwards.
                    let start = now.max(window.window_start);
                    *window = RateLimitWindow::open(key, start, window_ms);
                } else {
                    window.count = window.count.saturating_add(1);
                }
                self.decide(window)
            }
            Entry::Vacant(vacant) => {
                let window = vacant.insert(RateLimitWindow::open(key, now, window_ms));
                self.decide(&window)
            }
        }
    }

    fn decide(&self, window: &RateLimitWindow) -> Result<RateLimitDecision, LimiterError> {
        let reset_at = window
            .reset_at()
            .ok_or_else(|| LimiterError::WindowOverflow { key: window.key.clone() })?;
        let limit = self.rule.max_requests;
        let allowed = window.count <= limit;
        if !allowed {
            debug!(key = %window.key, count = window.count, limit, "Rate limit exceeded");
        }
        Ok(RateLimitDecision {
            allowed,
            limit,
            remaining: if allowed { limit - window.count } else { 0 },
            reset_at,
        })
    }

    /// Drop every window that has expired at `now`. Returns how many.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.windows.retain(|_, window| {
            let keep = !window.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Current window for `key`, if one is tracked.
    pub fn window(&self, key: &str) -> Option<RateLimitWindow> {
        self.windows.get(key).map(|w| w.clone())
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
