//! Liveness probe for the connection sampler.

use std::sync::Arc;

use async_trait::async_trait;
use lorekeep_core::{DataStoreProbe, PoolStatsProvider};
use lorekeep_domain::{PoolCounts, Result};
use rusqlite::params;
use tokio::task;

use super::DbManager;
use crate::errors::{map_join_error, map_sql_error};

/// Runs `SELECT 1` on a pooled connection.
///
/// The blocking checkout and query run on the blocking pool; the sampler
/// bounds the whole call with its own timeout.
#[derive(Debug, Clone)]
pub struct SqliteHealthProbe {
    db: Arc<DbManager>,
}

impl SqliteHealthProbe {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DataStoreProbe for SqliteHealthProbe {
    async fn ping(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

impl PoolStatsProvider for SqliteHealthProbe {
    fn pool_counts(&self) -> PoolCounts {
        self.db.pool_counts()
    }
}
