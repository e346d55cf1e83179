//! SQLite adapters for the monitoring ports

pub mod instrumented;
pub mod manager;
pub mod probe;

pub use instrumented::InstrumentedExecutor;
pub use manager::{DbManager, PooledSqlite};
pub use probe::SqliteHealthProbe;
