//! Conversions from external infrastructure errors into domain errors.

use r2d2::Error as PoolError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use staysync_domain::StaySyncError;

/// Error newtype that keeps conversions on the infrastructure side and can
/// be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub StaySyncError);

impl From<InfraError> for StaySyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<StaySyncError> for InfraError {
    fn from(value: StaySyncError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → StaySyncError */
/* -------------------------------------------------------------------------- */

// SQLite extended result codes for constraint failures. 2067 is
// SQLITE_CONSTRAINT_UNIQUE, 1555 is SQLITE_CONSTRAINT_PRIMARYKEY; both mean
// a uniqueness guarantee fired and a writer may want to recover by
// re-reading.
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;
const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;

impl From<SqlError> for InfraError {
    fn from(err: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        let mapped = match err {
            RE::SqliteFailure(code, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (code.code, code.extended_code) {
                    (ErrorCode::ConstraintViolation, SQLITE_CONSTRAINT_UNIQUE)
                    | (ErrorCode::ConstraintViolation, SQLITE_CONSTRAINT_PRIMARYKEY) => {
                        StaySyncError::UniqueViolation(message)
                    }
                    (ErrorCode::ConstraintViolation, extended) => StaySyncError::Database(format!(
                        "constraint violation (code {extended}): {message}"
                    )),
                    (ErrorCode::DatabaseBusy, _) => {
                        StaySyncError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        StaySyncError::Database("database is locked".into())
                    }
                    (code, extended) => StaySyncError::Database(format!(
                        "sqlite failure {code:?} (code {extended}): {message}"
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                StaySyncError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                StaySyncError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                StaySyncError::Database(format!("invalid column type: {ty}"))
            }
            other => StaySyncError::Database(other.to_string()),
        };

        InfraError(mapped)
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → StaySyncError */
/* -------------------------------------------------------------------------- */

impl From<PoolError> for InfraError {
    fn from(err: PoolError) -> Self {
        InfraError(StaySyncError::Database(format!("connection pool error: {err}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → StaySyncError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        let mapped = if err.is_timeout() {
            StaySyncError::Network(format!("http request timed out: {err}"))
        } else if err.is_connect() {
            StaySyncError::Network(format!("http connection failed: {err}"))
        } else if err.is_builder() {
            StaySyncError::InvalidInput(format!("invalid http request: {err}"))
        } else {
            StaySyncError::Network(format!("http error: {err}"))
        };
        InfraError(mapped)
    }
}
