//! Query metric records and the summaries derived from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded query or request execution.
///
/// `fingerprint` is the statement text with literals masked. It is only used
/// for grouping and logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySample {
    pub fingerprint: String,
    pub duration_ms: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl QuerySample {
    /// Sample for an operation that completed.
    pub fn succeeded(
        fingerprint: impl Into<String>,
        duration_ms: f64,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            duration_ms,
            success: true,
            error_text: None,
            captured_at,
        }
    }

    /// Sample for an operation that failed with `error_text`.
    pub fn failed(
        fingerprint: impl Into<String>,
        duration_ms: f64,
        error_text: impl Into<String>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            duration_ms,
            success: false,
            error_text: Some(error_text.into()),
            captured_at,
        }
    }

    /// Returns `true` when the sample took longer than `threshold_ms`.
    pub fn is_slow(&self, threshold_ms: f64) -> bool {
        self.duration_ms > threshold_ms
    }
}

/// Aggregate view over the retained samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub total_samples: usize,
    pub average_duration_ms: f64,
    /// Percentage (0-100) of samples slower than `slow_threshold_ms`.
    pub slow_percentage: f64,
    /// Fraction (0-1) of samples that failed.
    pub error_rate: f64,
    pub slow_threshold_ms: f64,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
}

impl PerformanceSummary {
    /// Summary over no samples.
    pub fn empty(slow_threshold_ms: f64) -> Self {
        Self {
            total_samples: 0,
            average_duration_ms: 0.0,
            slow_percentage: 0.0,
            error_rate: 0.0,
            slow_threshold_ms,
            window_start: None,
            window_end: None,
        }
    }
}

/// Advisory finding for one query fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySuggestion {
    pub fingerprint: String,
    pub occurrences: usize,
    pub average_duration_ms: f64,
    pub issues: Vec<String>,
}
