use chrono::{DateTime, Utc};
use lorekeep_domain::{RateLimitDecision, RateLimitsConfig, RouteClass};

use super::keys::{extractor_for, ClientIdentity, KeyExtractor};
use super::{LimiterError, RateLimiter};

/// One independently configured limiter per route class, sharing a key
/// extractor.
pub struct RateLimiterSet {
    api: RateLimiter,
    health: RateLimiter,
    auth: RateLimiter,
    extractor: Box<dyn KeyExtractor>,
}

impl RateLimiterSet {
    /// # Errors
    /// Returns `LimiterError::InvalidRule` if any class has a zero cap or
    /// window.
    pub fn from_config(config: &RateLimitsConfig) -> Result<Self, LimiterError> {
        Self::with_extractor(config, extractor_for(config.key_strategy))
    }

    pub fn with_extractor(
        config: &RateLimitsConfig,
        extractor: Box<dyn KeyExtractor>,
    ) -> Result<Self, LimiterError> {
        Ok(Self {
            api: RateLimiter::new(config.api)?,
            health: RateLimiter::new(config.health)?,
            auth: RateLimiter::new(config.auth)?,
            extractor,
        })
    }

    pub fn limiter(&self, class: RouteClass) -> &RateLimiter {
        match class {
            RouteClass::Api => &self.api,
            RouteClass::Health => &self.health,
            RouteClass::Auth => &self.auth,
        }
    }

    /// Derive the key for `identity` and check it against `class`'s limiter.
    ///
    /// # Errors
    /// `MissingKey` when no key can be derived, or any error from
    /// [`RateLimiter::check`].
    pub fn check(
        &self,
        class: RouteClass,
        identity: &ClientIdentity,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, LimiterError> {
        let key = self.extractor.key(identity).ok_or(LimiterError::MissingKey)?;
        self.limiter(class).check(&key, now)
    }

    /// Sweep expired windows from every class. Returns the total removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        [RouteClass::Api, RouteClass::Health, RouteClass::Auth]
            .into_iter()
            .map(|class| self.limiter(class).sweep_expired(now))
            .sum()
    }
}
