//! Database connection manager backed by an r2d2 SQLite pool.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use lorekeep_core::PoolStatsProvider;
use lorekeep_domain::{DatabaseConfig, PoolCounts, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::{info, instrument, warn};

use crate::errors::{map_pool_error, map_sql_error};

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
";

/// Busy timeout applied to every pooled connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A connection checked out of the pool.
pub type PooledSqlite = PooledConnection<SqliteConnectionManager>;

/// Database manager that wraps an r2d2 [`Pool`].
///
/// Besides handing out connections it counts the callers currently blocked
/// waiting for one, which r2d2 does not expose.
#[derive(Debug)]
pub struct DbManager {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
    max_size: u32,
    waiting: AtomicU32,
}

/// Decrements the waiting count once checkout returns.
struct WaitingGuard<'a>(&'a AtomicU32);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl DbManager {
    /// Open (or create) the database at `db_path` with a pool of `pool_size`
    /// connections.
    ///
    /// # Errors
    /// Returns `LorekeepError::Database` when the pool cannot open its
    /// initial connections.
    #[instrument(skip(db_path), fields(db_path = %db_path.as_ref().display()))]
    pub fn new<P: AsRef<Path>>(
        db_path: P,
        pool_size: u32,
        connection_timeout: Duration,
    ) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let max_size = pool_size.max(1);

        let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA foreign_keys=ON;",
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)
        });

        let pool = Pool::builder()
            .max_size(max_size)
            .connection_timeout(connection_timeout)
            .build(manager)
            .map_err(|err| {
                warn!(error = %err, "Failed to create connection pool");
                map_pool_error(err)
            })?;

        info!(max_connections = max_size, "sqlite pool initialised");

        Ok(Self { pool, path, max_size, waiting: AtomicU32::new(0) })
    }

    /// Build a manager from the `[database]` configuration section.
    ///
    /// # Errors
    /// See [`DbManager::new`].
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::new(
            &config.path,
            config.pool_size,
            Duration::from_millis(config.connection_timeout_ms),
        )
    }

    /// Acquire a connection from the pool, blocking up to the configured
    /// connection timeout.
    ///
    /// # Errors
    /// `LorekeepError::Timeout` when the pool stays exhausted past the
    /// timeout.
    pub fn get_connection(&self) -> Result<PooledSqlite> {
        self.waiting.fetch_add(1, Ordering::AcqRel);
        let _guard = WaitingGuard(&self.waiting);
        self.pool.get().map_err(map_pool_error)
    }

    /// Ensure the schema exists on the current database.
    ///
    /// # Errors
    /// Propagates connection and SQL errors.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, CAST(strftime('%s','now') AS INTEGER))",
            params![SCHEMA_VERSION],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Synchronous connectivity check: one pooled `SELECT 1`.
    ///
    /// # Errors
    /// Propagates connection and SQL errors.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0)).map_err(map_sql_error)?;
        Ok(())
    }
}

impl PoolStatsProvider for DbManager {
    fn pool_counts(&self) -> PoolCounts {
        let state = self.pool.state();
        PoolCounts {
            active: state.connections.saturating_sub(state.idle_connections),
            idle: state.idle_connections,
            waiting: self.waiting.load(Ordering::Acquire),
            max_size: self.max_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn manager(temp_dir: &TempDir, pool_size: u32) -> DbManager {
        DbManager::new(temp_dir.path().join("test.db"), pool_size, Duration::from_millis(500))
            .expect("manager created")
    }

    #[test]
    fn migrations_create_schema_version() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager = manager(&temp_dir, 2);
        manager.run_migrations().expect("migrations run");
        manager.run_migrations().expect("migrations are idempotent");

        let conn = manager.get_connection().expect("connection acquired");
        let version: i32 = conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .expect("version row");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn health_check_succeeds_for_valid_database() {
        let temp_dir = TempDir::new().expect("temp dir created");
        manager(&temp_dir, 2).health_check().expect("health check passed");
    }

    #[test]
    fn pool_counts_track_checked_out_connections() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager = manager(&temp_dir, 3);

        let first = manager.get_connection().expect("first");
        let second = manager.get_connection().expect("second");
        let counts = manager.pool_counts();
        assert_eq!(counts.active, 2);
        assert_eq!(counts.waiting, 0);
        assert_eq!(counts.max_size, 3);

        drop(first);
        drop(second);
        assert_eq!(manager.pool_counts().active, 0);
    }

    #[test]
    fn exhausted_pool_times_out() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager = DbManager::new(temp_dir.path().join("test.db"), 1, Duration::from_millis(50))
            .expect("manager created");

        let _held = manager.get_connection().expect("only connection");
        let err = manager.get_connection().expect_err("pool exhausted");
        assert!(matches!(err, lorekeep_domain::LorekeepError::Timeout(_)));
        assert_eq!(manager.pool_counts().waiting, 0);
    }
}
