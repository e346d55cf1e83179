//! Query execution that reports every statement to the metric recorder.

use std::sync::Arc;

use lorekeep_common::time::{Clock, SystemClock};
use lorekeep_core::monitoring::fingerprint;
use lorekeep_core::MonitoringHub;
use lorekeep_domain::{QuerySample, Result};
use rusqlite::Connection;
use tokio::task;
use tracing::debug;

use super::DbManager;
use crate::errors::{map_join_error, map_sql_error};

/// Runs statements on pooled connections and records one sample per call.
///
/// Samples are keyed by the statement's fingerprint, so literals never reach
/// the recorder. Failures raise an error alert and slow statements a
/// performance alert through [`MonitoringHub::report_operation`].
#[derive(Clone)]
pub struct InstrumentedExecutor {
    db: Arc<DbManager>,
    hub: MonitoringHub,
    clock: Arc<dyn Clock>,
}

impl InstrumentedExecutor {
    pub fn new(db: Arc<DbManager>, hub: MonitoringHub) -> Self {
        Self::with_clock(db, hub, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Arc<DbManager>, hub: MonitoringHub, clock: Arc<dyn Clock>) -> Self {
        Self { db, hub, clock }
    }

    /// Run `op` with the connection and `sql`, timing checkout and execution
    /// together.
    ///
    /// # Errors
    /// Connection, SQL and join errors, mapped to `LorekeepError`. The
    /// sample is recorded either way.
    pub async fn run<T, F>(&self, sql: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> rusqlite::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let statement = sql.to_owned();
        let started = self.clock.now();

        let result = task::spawn_blocking(move || -> Result<T> {
            let conn = db.get_connection()?;
            op(&conn, &statement).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)
        .and_then(|inner| inner);

        let elapsed = self.clock.now().duration_since(started);
        let duration_ms = elapsed.as_nanos() as f64 / 1_000_000.0;
        let key = fingerprint(sql);
        let captured_at = self.clock.utc_now();
        debug!(fingerprint = %key, duration_ms, success = result.is_ok(), "Query executed");

        let sample = match &result {
            Ok(_) => QuerySample::succeeded(key, duration_ms, captured_at),
            Err(err) => QuerySample::failed(key, duration_ms, err.to_string(), captured_at),
        };
        self.hub.report_operation(sample);
        result
    }

    /// Run a statement that yields a single integer.
    ///
    /// # Errors
    /// See [`run`](Self::run).
    pub async fn query_i64(&self, sql: &str) -> Result<i64> {
        self.run(sql, |conn, sql| conn.query_row(sql, [], |row| row.get(0))).await
    }

    /// Execute a statement, returning the number of changed rows.
    ///
    /// # Errors
    /// See [`run`](Self::run).
    pub async fn execute(&self, sql: &str) -> Result<usize> {
        self.run(sql, |conn, sql| conn.execute(sql, [])).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use lorekeep_domain::{AlertKind, AlertSeverity};
    use tempfile::TempDir;

    use super::*;

    fn executor(temp_dir: &TempDir) -> InstrumentedExecutor {
        let db = Arc::new(
            DbManager::new(temp_dir.path().join("exec.db"), 2, Duration::from_millis(500))
                .expect("manager created"),
        );
        InstrumentedExecutor::new(db, MonitoringHub::new(100, 100, 1_000.0, Utc::now()))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn successful_queries_are_recorded_by_fingerprint() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let exec = executor(&temp_dir);

        exec.execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)").await.expect("ddl");
        exec.execute("INSERT INTO notes (body) VALUES ('first')").await.expect("insert");
        let count = exec.query_i64("SELECT COUNT(*) FROM notes WHERE id > 0").await.expect("count");
        assert_eq!(count, 1);

        let samples = exec.hub.recorder.snapshot(10);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1].fingerprint, "INSERT INTO notes (body) VALUES (?)");
        assert_eq!(samples[2].fingerprint, "SELECT COUNT(*) FROM notes WHERE id > ?");
        assert!(samples.iter().all(|s| s.success));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_queries_raise_error_alerts() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let exec = executor(&temp_dir);

        let err = exec.query_i64("SELECT COUNT(*) FROM missing_table").await;
        assert!(err.is_err());

        let samples = exec.hub.recorder.snapshot(10);
        assert_eq!(samples.len(), 1);
        assert!(!samples[0].success);
        assert!(samples[0].error_text.as_deref().is_some_and(|e| e.contains("missing_table")));

        let alerts = exec.hub.alerts.recent(10);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Error);
        assert_eq!(alerts[0].severity, AlertSeverity::Medium);
    }
}
