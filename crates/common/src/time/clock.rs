//! Clock abstraction shared by the monitor and the rate limiter.
//!
//! Production code uses [`SystemClock`]. Tests drive [`MockClock`] forward
//! explicitly so window expiry and alert retention can be checked without
//! sleeping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Monotonic instant, used for elapsed-time measurement.
    fn now(&self) -> Instant;

    /// Wall-clock time in UTC, used for timestamps that leave the process.
    fn utc_now(&self) -> DateTime<Utc>;

    /// Milliseconds since the UNIX epoch.
    fn millis_since_epoch(&self) -> i64 {
        self.utc_now().timestamp_millis()
    }
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        (**self).utc_now()
    }
}

/// Mock clock for deterministic testing
///
/// Cloned handles share the same elapsed counter, so a test can keep one
/// handle and advance time seen by every component holding another.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    wall_start: DateTime<Utc>,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Mock clock whose wall time starts at 2024-01-01T00:00:00Z.
    pub fn new() -> Self {
        let wall_start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();
        Self::starting_at(wall_start)
    }

    /// Mock clock whose wall time starts at `wall_start`.
    pub fn starting_at(wall_start: DateTime<Utc>) -> Self {
        Self { start: Instant::now(), wall_start, elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Advance the mock clock by milliseconds (convenience method)
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.elapsed()).unwrap_or(chrono::Duration::MAX);
        self.wall_start.checked_add_signed(elapsed).unwrap_or(self.wall_start)
    }
}
