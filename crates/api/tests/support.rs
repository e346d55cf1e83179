//! Shared fixtures for api integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use chrono::Utc;
use lorekeep_core::{
    ConnectionSampler, DataStoreProbe, MonitoringHub, PoolStatsProvider, RateLimiterSet,
    RequestGate, SamplerSettings,
};
use lorekeep_domain::{
    HealthThresholds, LorekeepError, PoolCounts, RateLimitsConfig, Result as DomainResult,
};
use lorekeep_infra::{DbManager, InstrumentedExecutor};
use lorekeep_lib::{router, AppState};
use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Data store whose pool counts and liveness are set by the test.
#[derive(Default)]
pub struct FakeStore {
    counts: Mutex<PoolCounts>,
    failing: AtomicBool,
}

impl FakeStore {
    pub fn set_counts(&self, active: u32, idle: u32) {
        *self.counts.lock() = PoolCounts { active, idle, waiting: 0, max_size: 100 };
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataStoreProbe for FakeStore {
    async fn ping(&self) -> DomainResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LorekeepError::Database("connection refused".into()));
        }
        Ok(())
    }
}

impl PoolStatsProvider for FakeStore {
    fn pool_counts(&self) -> PoolCounts {
        *self.counts.lock()
    }
}

/// Router wired to a fake store for health and a temp SQLite database for
/// business routes.
pub struct TestApp {
    pub state: AppState,
    pub sampler: Arc<ConnectionSampler>,
    pub store: Arc<FakeStore>,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_rate_limits(RateLimitsConfig::default())
    }

    pub fn with_rate_limits(rate_limits: RateLimitsConfig) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let db = Arc::new(
            DbManager::new(temp_dir.path().join("lorekeep.db"), 4, Duration::from_millis(500))
                .expect("open test database"),
        );
        db.run_migrations().expect("run migrations");

        let hub = MonitoringHub::new(1_000, 100, 1_000.0, Utc::now());
        let limiters = Arc::new(RateLimiterSet::from_config(&rate_limits).expect("valid limits"));
        let gate = RequestGate::new(limiters, hub.clone());

        let store = Arc::new(FakeStore::default());
        store.set_counts(5, 5);
        let sampler = Arc::new(ConnectionSampler::new(
            Arc::clone(&store) as Arc<dyn DataStoreProbe>,
            Arc::clone(&store) as Arc<dyn PoolStatsProvider>,
            hub.clone(),
            SamplerSettings {
                probe_timeout: Duration::from_secs(1),
                thresholds: HealthThresholds::default(),
            },
        ));

        let state = AppState {
            gate,
            hub: hub.clone(),
            executor: InstrumentedExecutor::new(db, hub),
            pool: Arc::clone(&store) as Arc<dyn PoolStatsProvider>,
        };

        Self { state, sampler, store, _temp_dir: temp_dir }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Send one request through a fresh router clone.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.expect("router is infallible")
    }
}

pub fn get(path: &str, client: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .expect("request builds")
}

pub fn post(path: &str, client: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .expect("request builds")
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("body is JSON")
}
