//! Conversions from external infrastructure errors into domain errors.

use lorekeep_domain::LorekeepError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub LorekeepError);

impl From<InfraError> for LorekeepError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<LorekeepError> for InfraError {
    fn from(value: LorekeepError) -> Self {
        InfraError(value)
    }
}

impl std::fmt::Display for InfraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for InfraError {}

trait IntoLorekeepError {
    fn into_lorekeep(self) -> LorekeepError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → LorekeepError */
/* -------------------------------------------------------------------------- */

impl IntoLorekeepError for SqlError {
    fn into_lorekeep(self) -> LorekeepError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        LorekeepError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        LorekeepError::Database("database is locked".into())
                    }
                    (ErrorCode::CannotOpen, _) => {
                        LorekeepError::Database(format!("unable to open database: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        LorekeepError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        LorekeepError::Database("foreign key constraint violation".into())
                    }
                    _ => LorekeepError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => LorekeepError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                LorekeepError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                LorekeepError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidParameterName(parameter_name) => {
                LorekeepError::InvalidInput(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => LorekeepError::Config(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => LorekeepError::InvalidInput("invalid SQL query".into()),
            other => LorekeepError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_lorekeep())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → LorekeepError */
/* -------------------------------------------------------------------------- */

impl IntoLorekeepError for r2d2::Error {
    fn into_lorekeep(self) -> LorekeepError {
        // r2d2 only reports checkout timeouts, optionally carrying the last
        // connection error.
        let message = self.to_string();
        if message.to_ascii_lowercase().contains("timed out") {
            LorekeepError::Timeout(format!("connection pool checkout: {message}"))
        } else {
            LorekeepError::Database(format!("connection pool: {message}"))
        }
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_lorekeep())
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → LorekeepError */
/* -------------------------------------------------------------------------- */

impl IntoLorekeepError for JoinError {
    fn into_lorekeep(self) -> LorekeepError {
        if self.is_cancelled() {
            LorekeepError::Internal("blocking database task was cancelled".into())
        } else {
            LorekeepError::Internal(format!("blocking database task panicked: {self}"))
        }
    }
}

impl From<JoinError> for InfraError {
    fn from(value: JoinError) -> Self {
        InfraError(value.into_lorekeep())
    }
}

/// Map a rusqlite error straight to the domain error.
pub(crate) fn map_sql_error(err: SqlError) -> LorekeepError {
    InfraError::from(err).into()
}

/// Map a pool checkout error straight to the domain error.
pub(crate) fn map_pool_error(err: r2d2::Error) -> LorekeepError {
    InfraError::from(err).into()
}

/// Map a `spawn_blocking` join failure straight to the domain error.
pub(crate) fn map_join_error(err: JoinError) -> LorekeepError {
    InfraError::from(err).into()
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
