//! Bounded in-memory query metric log with rolling aggregates.

use lorekeep_common::collections::BoundedLog;
use lorekeep_domain::{PerformanceSummary, QuerySample};
use parking_lot::Mutex;

/// Bounded log of query samples.
///
/// Append and eviction happen under one lock together with the running
/// duration sum and error count, so aggregates always describe exactly the
/// retained samples.
pub struct MetricRecorder {
    state: Mutex<RecorderState>,
    slow_threshold_ms: f64,
}

struct RecorderState {
    log: BoundedLog<QuerySample>,
    /// Sum of retained durations in whole microseconds. Integer arithmetic
    /// keeps add-then-subtract exact regardless of sample magnitudes.
    duration_sum_us: u128,
    error_count: usize,
}

impl RecorderState {
    fn average(&self) -> f64 {
        if self.log.is_empty() {
            0.0
        } else {
            self.duration_sum_us as f64 / self.log.len() as f64 / 1_000.0
        }
    }
}

/// Duration in whole microseconds. Float-to-int `as` saturates, so huge
/// values pin at `u64::MAX` and map back to the same amount on eviction.
fn micros(duration_ms: f64) -> u128 {
    u128::from((duration_ms * 1_000.0).round() as u64)
}

impl MetricRecorder {
    /// Recorder keeping at most `capacity` samples. `slow_threshold_ms` is
    /// the default threshold used by [`summary`](Self::summary).
    pub fn new(capacity: usize, slow_threshold_ms: f64) -> Self {
        Self {
            state: Mutex::new(RecorderState {
                log: BoundedLog::new(capacity),
                duration_sum_us: 0,
                error_count: 0,
            }),
            slow_threshold_ms,
        }
    }

    /// Append a sample, evicting the oldest when full.
    ///
    /// Negative or non-finite durations are clamped to zero.
    pub fn record(&self, mut sample: QuerySample) {
        if !sample.duration_ms.is_finite() || sample.duration_ms < 0.0 {
            sample.duration_ms = 0.0;
        }

        let mut state = self.state.lock();
        state.duration_sum_us += micros(sample.duration_ms);
        if !sample.success {
            state.error_count += 1;
        }

        if let Some(evicted) = state.log.push(sample) {
            state.duration_sum_us -= micros(evicted.duration_ms);
            if !evicted.success {
                state.error_count -= 1;
            }
        }
    }

    /// Mean duration over retained samples, 0 when empty.
    pub fn rolling_average_ms(&self) -> f64 {
        self.state.lock().average()
    }

    /// Number of retained samples slower than `threshold_ms`.
    pub fn slow_count(&self, threshold_ms: f64) -> usize {
        self.state.lock().log.iter().filter(|s| s.is_slow(threshold_ms)).count()
    }

    /// Share (0-1) of retained samples slower than `threshold_ms`.
    pub fn slow_fraction(&self, threshold_ms: f64) -> f64 {
        let state = self.state.lock();
        if state.log.is_empty() {
            return 0.0;
        }
        let slow = state.log.iter().filter(|s| s.is_slow(threshold_ms)).count();
        slow as f64 / state.log.len() as f64
    }

    /// Share (0-1) of retained samples that failed.
    pub fn error_rate(&self) -> f64 {
        let state = self.state.lock();
        if state.log.is_empty() {
            0.0
        } else {
            state.error_count as f64 / state.log.len() as f64
        }
    }

    /// The `limit` most recent samples, oldest first.
    pub fn snapshot(&self, limit: usize) -> Vec<QuerySample> {
        self.state.lock().log.tail(limit).into_iter().cloned().collect()
    }

    pub fn summary(&self) -> PerformanceSummary {
        let state = self.state.lock();
        let total = state.log.len();
        if total == 0 {
            return PerformanceSummary::empty(self.slow_threshold_ms);
        }

        let slow = state.log.iter().filter(|s| s.is_slow(self.slow_threshold_ms)).count();
        PerformanceSummary {
            total_samples: total,
            average_duration_ms: state.average(),
            slow_percentage: slow as f64 / total as f64 * 100.0,
            error_rate: state.error_count as f64 / total as f64,
            slow_threshold_ms: self.slow_threshold_ms,
            window_start: state.log.oldest().map(|s| s.captured_at),
            window_end: state.log.newest().map(|s| s.captured_at),
        }
    }

    pub fn slow_threshold_ms(&self) -> f64 {
        self.slow_threshold_ms
    }

    pub fn len(&self) -> usize {
        self.state.lock().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().log.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().log.capacity()
    }
}
