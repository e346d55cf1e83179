//! Request gate: rate limit, then health verdict, then business logic.
//!
//! The gate never probes the data store. It reads the verdict last
//! published by the sampler, so admission stays non-blocking.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use lorekeep_common::error::{ErrorClassification, ErrorSeverity};
use lorekeep_common::time::{Clock, SystemClock};
use lorekeep_domain::{HealthState, HealthStatus, QuerySample, RateLimitDecision, RouteClass};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::monitoring::MonitoringHub;
use crate::rate_limit::{ClientIdentity, RateLimiterSet};

/// Response header names. Lowercase so they can be used as static HTTP
/// header names directly.
pub mod headers {
    pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
    pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
    pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
    pub const RETRY_AFTER: &str = "retry-after";
    pub const DATABASE_HEALTH: &str = "x-database-health";
    pub const DATABASE_RESPONSE_TIME: &str = "x-database-response-time";
    pub const DATABASE_CONNECTIONS: &str = "x-database-connections";
}

/// Anything the gate can attach headers to.
pub trait ResponseSink {
    fn attach(&mut self, name: &'static str, value: String);
}

/// Ordered header list collected during admission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateHeaders(Vec<(&'static str, String)>);

impl GateHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(n, v)| (*n, v.as_str()))
    }
}

impl ResponseSink for GateHeaders {
    fn attach(&mut self, name: &'static str, value: String) {
        self.0.push((name, value));
    }
}

/// Body of a 429 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TooManyRequestsBody {
    pub error: String,
    pub message: String,
    /// Seconds until the window resets.
    pub retry_after: u64,
}

/// Body of a 503 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUnavailableBody {
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Why the gate short-circuited a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GateRejection {
    TooManyRequests(TooManyRequestsBody),
    Unavailable(ServiceUnavailableBody),
}

impl GateRejection {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::TooManyRequests(_) => 429,
            Self::Unavailable(_) => 503,
        }
    }
}

/// Token for an admitted request, handed back to [`RequestGate::complete`].
#[derive(Debug)]
#[must_use = "report the outcome with RequestGate::complete"]
pub struct Admission {
    pub route: RouteClass,
    pub status: HealthStatus,
    pub decision: Option<RateLimitDecision>,
    started: Instant,
}

/// Composition point in front of business logic.
#[derive(Clone)]
pub struct RequestGate {
    limiters: Arc<RateLimiterSet>,
    hub: MonitoringHub,
    clock: Arc<dyn Clock>,
}

impl RequestGate {
    pub fn new(limiters: Arc<RateLimiterSet>, hub: MonitoringHub) -> Self {
        Self::with_clock(limiters, hub, Arc::new(SystemClock))
    }

    pub fn with_clock(
        limiters: Arc<RateLimiterSet>,
        hub: MonitoringHub,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { limiters, hub, clock }
    }

    pub fn limiters(&self) -> &Arc<RateLimiterSet> {
        &self.limiters
    }

    /// Run the rate-limit and health checks for one request.
    ///
    /// Headers are attached to `sink` whether or not the request is
    /// admitted. A limiter failure skips limiting for this request.
    ///
    /// # Errors
    /// `TooManyRequests` when the client exhausted its window,
    /// `Unavailable` when the published verdict is unhealthy.
    pub fn admit<S: ResponseSink>(
        &self,
        identity: &ClientIdentity,
        route: RouteClass,
        sink: &mut S,
    ) -> Result<Admission, GateRejection> {
        let now = self.clock.utc_now();

        let decision = match self.limiters.check(route, identity, now) {
            Ok(decision) => Some(decision),
            Err(err) => {
                if err.severity() >= ErrorSeverity::Error {
                    error!(error = %err, route = %route, "Rate limiter failed, skipping limit");
                } else {
                    warn!(error = %err, route = %route, "Rate limiter failed, skipping limit");
                }
                None
            }
        };

        if let Some(decision) = &decision {
            attach_rate_limit_headers(sink, decision);
            if !decision.allowed {
                let retry_after = decision.retry_after_secs(now);
                sink.attach(headers::RETRY_AFTER, retry_after.to_string());
                debug!(route = %route, retry_after, "Request rate limited");
                return Err(GateRejection::TooManyRequests(TooManyRequestsBody {
                    error: "Too Many Requests".to_string(),
                    message: format!(
                        "Rate limit of {} requests exceeded. Try again in {retry_after} seconds.",
                        decision.limit
                    ),
                    retry_after,
                }));
            }
        }

        let state = self.hub.health.current();
        attach_health_headers(sink, &state);

        match state.verdict.status {
            HealthStatus::Unhealthy => {
                let reasons = state.verdict.reasons.join("; ");
                error!(route = %route, reasons = %reasons, "Rejecting request: database unhealthy");
                Err(GateRejection::Unavailable(ServiceUnavailableBody {
                    error: "Database unavailable".to_string(),
                    message: format!("Database is currently unhealthy: {reasons}"),
                    timestamp: now,
                }))
            }
            status => {
                if status == HealthStatus::Degraded {
                    warn!(
                        route = %route,
                        reasons = ?state.verdict.reasons,
                        "Serving request while database is degraded"
                    );
                }
                Ok(Admission { route, status, decision, started: self.clock.now() })
            }
        }
    }

    /// Report an admitted request's outcome to the metric recorder.
    ///
    /// `operation` becomes the sample fingerprint, e.g. `GET /api/v1/status`.
    pub fn complete(
        &self,
        admission: Admission,
        operation: &str,
        success: bool,
        error_text: Option<String>,
    ) {
        let elapsed = self.clock.now().duration_since(admission.started);
        let duration_ms = elapsed.as_nanos() as f64 / 1_000_000.0;
        let captured_at = self.clock.utc_now();
        let sample = match error_text {
            Some(text) if !success => QuerySample::failed(operation, duration_ms, text, captured_at),
            None if !success => {
                QuerySample::failed(operation, duration_ms, "request failed", captured_at)
            }
            _ => QuerySample::succeeded(operation, duration_ms, captured_at),
        };
        self.hub.report_operation(sample);
    }

    /// Wrap `admission` so it is reported even if the request is abandoned.
    pub fn track(&self, admission: Admission, operation: impl Into<String>) -> PendingCompletion {
        PendingCompletion {
            gate: self.clone(),
            admission: Some(admission),
            operation: operation.into(),
        }
    }
}

/// An admitted request in flight.
///
/// Call [`finish`](Self::finish) with the outcome. Dropping it unfinished,
/// e.g. when the client disconnects mid-handler, records a failed sample.
#[must_use = "report the outcome with PendingCompletion::finish"]
pub struct PendingCompletion {
    gate: RequestGate,
    admission: Option<Admission>,
    operation: String,
}

impl PendingCompletion {
    pub fn finish(mut self, success: bool, error_text: Option<String>) {
        if let Some(admission) = self.admission.take() {
            self.gate.complete(admission, &self.operation, success, error_text);
        }
    }
}

impl Drop for PendingCompletion {
    fn drop(&mut self) {
        if let Some(admission) = self.admission.take() {
            debug!(operation = %self.operation, "Request dropped before completion");
            self.gate.complete(
                admission,
                &self.operation,
                false,
                Some("request cancelled".to_string()),
            );
        }
    }
}

fn attach_rate_limit_headers<S: ResponseSink>(sink: &mut S, decision: &RateLimitDecision) {
    sink.attach(headers::RATE_LIMIT_LIMIT, decision.limit.to_string());
    sink.attach(headers::RATE_LIMIT_REMAINING, decision.remaining.to_string());
    sink.attach(
        headers::RATE_LIMIT_RESET,
        decision.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    );
}

fn attach_health_headers<S: ResponseSink>(sink: &mut S, state: &HealthState) {
    let latency = state.snapshot.probe_latency_ms.unwrap_or(-1.0);
    sink.attach(headers::DATABASE_HEALTH, state.verdict.status.to_string());
    sink.attach(headers::DATABASE_RESPONSE_TIME, format!("{latency:.2}"));
    sink.attach(headers::DATABASE_CONNECTIONS, state.snapshot.total.to_string());
}
