//! SQLite-backed implementations of the core repository ports.

pub mod action_repository;
pub mod booking_repository;
pub mod conflict_repository;
pub mod manager;
pub mod source_repository;
pub mod sync_log_repository;

pub use action_repository::SqliteSyncActionRepository;
pub use booking_repository::SqliteBookingRepository;
pub use conflict_repository::SqliteConflictRepository;
pub use manager::{DbManager, SqlitePool};
pub use source_repository::SqliteCalendarSourceRepository;
pub use sync_log_repository::SqliteSyncLogRepository;

use chrono::{DateTime, NaiveDate, Utc};
use staysync_domain::{Result, StaySyncError};

/// Parse a stored ISO date column.
pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|err| StaySyncError::Database(format!("invalid stored date '{value}': {err}")))
}

pub(crate) fn parse_opt_date(value: Option<String>) -> Result<Option<NaiveDate>> {
    value.as_deref().map(parse_date).transpose()
}

/// Parse a stored epoch-seconds timestamp column.
pub(crate) fn parse_timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StaySyncError::Database(format!("invalid stored timestamp {secs}")))
}

pub(crate) fn parse_opt_timestamp(secs: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    secs.map(parse_timestamp).transpose()
}
