//! Sampler, executor and schedulers running against a real SQLite pool.

mod support;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lorekeep_core::{ConnectionSampler, MonitoringHub, SamplerSettings};
use lorekeep_domain::{AlertKind, AlertSeverity, HealthStatus, HealthThresholds};
use lorekeep_infra::{HealthScheduler, InstrumentedExecutor, SqliteHealthProbe};
use support::{init_test_tracing, TestDatabase};

fn sampler_for(db: &TestDatabase, hub: &MonitoringHub, thresholds: HealthThresholds) -> ConnectionSampler {
    let probe = Arc::new(SqliteHealthProbe::new(Arc::clone(&db.manager)));
    ConnectionSampler::new(
        probe,
        Arc::clone(&db.manager) as Arc<dyn lorekeep_core::PoolStatsProvider>,
        hub.clone(),
        SamplerSettings { probe_timeout: Duration::from_secs(2), thresholds },
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn healthy_pool_publishes_counts_and_probe_sample() {
    init_test_tracing();
    let db = TestDatabase::default();
    let hub = MonitoringHub::new(100, 100, 1_000.0, Utc::now());
    let sampler = sampler_for(&db, &hub, HealthThresholds::default());

    let snapshot = sampler.tick().await;

    assert!(!snapshot.stale);
    assert!(snapshot.probe_latency_ms.is_some());
    assert!(snapshot.total <= 4);
    let state = hub.health.current();
    assert_eq!(state.verdict.status, HealthStatus::Healthy);
    assert_eq!(state.pool_max_size, 4);
    assert_eq!(hub.recorder.snapshot(10)[0].fingerprint, "SELECT 1");
}

#[tokio::test(flavor = "multi_thread")]
async fn exhausted_pool_fails_probe_and_turns_unhealthy() {
    init_test_tracing();
    let db = TestDatabase::with_pool(1, Duration::from_millis(50));
    let hub = MonitoringHub::new(100, 100, 1_000.0, Utc::now());
    let sampler = sampler_for(&db, &hub, HealthThresholds::default());

    let held = db.manager.get_connection().expect("only connection");
    let snapshot = sampler.tick().await;
    drop(held);

    assert!(snapshot.stale);
    assert_eq!(snapshot.total, -1);
    assert_eq!(hub.health.status(), HealthStatus::Unhealthy);

    let critical = hub.alerts.by_severity(AlertSeverity::Critical);
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].kind, AlertKind::Connection);

    // Recovery on the next tick.
    sampler.tick().await;
    assert_eq!(hub.health.status(), HealthStatus::Healthy);
}

#[tokio::test(flavor = "multi_thread")]
async fn executor_samples_feed_the_rolling_average() {
    init_test_tracing();
    let db = TestDatabase::default();
    db.execute_batch("CREATE TABLE characters (id INTEGER PRIMARY KEY, name TEXT NOT NULL);");
    let hub = MonitoringHub::new(100, 100, 1_000.0, Utc::now());
    let exec = InstrumentedExecutor::new(Arc::clone(&db.manager), hub.clone());

    for name in ["Keyleth", "Grog", "Pike"] {
        exec.execute(&format!("INSERT INTO characters (name) VALUES ('{name}')"))
            .await
            .expect("insert");
    }
    let count = exec
        .query_i64("SELECT COUNT(*) FROM characters WHERE name <> ''")
        .await
        .expect("count");

    assert_eq!(count, 3);
    let summary = hub.recorder.summary();
    assert_eq!(summary.total_samples, 4);
    assert!(summary.error_rate.abs() < f64::EPSILON);

    let fingerprints: Vec<_> =
        hub.recorder.snapshot(10).into_iter().map(|s| s.fingerprint).collect();
    assert_eq!(
        fingerprints.iter().filter(|f| *f == "INSERT INTO characters (name) VALUES (?)").count(),
        3
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn scheduler_keeps_state_fresh() {
    init_test_tracing();
    let db = TestDatabase::default();
    let hub = MonitoringHub::new(100, 100, 1_000.0, Utc::now());
    let sampler = Arc::new(sampler_for(&db, &hub, HealthThresholds::default()));

    let mut scheduler = HealthScheduler::new(sampler, Duration::from_millis(50));
    scheduler.start().expect("start");
    tokio::time::sleep(Duration::from_millis(220)).await;
    scheduler.stop().await.expect("stop");

    assert!(hub.recorder.len() >= 2);
    assert!(!hub.health.current().snapshot.stale);
}
