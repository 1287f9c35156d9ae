//! SQLite-backed implementation of the CalendarSourceRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use staysync_core::sync::ports::CalendarSourceRepository;
use staysync_domain::{CalendarSource, Platform, Result, StaySyncError, SyncOutcome};
use tracing::{debug, instrument};

use crate::errors::InfraError;

use super::{parse_opt_timestamp, parse_timestamp, SqlitePool};

const SOURCE_COLUMNS: &str = "id, property_id, platform, feed_url, sync_enabled, \
     sync_interval_minutes, last_synced_at, last_sync_status, created_at";

/// SQLite implementation of [`CalendarSourceRepository`].
pub struct SqliteCalendarSourceRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteCalendarSourceRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn connection(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        self.pool.get().map_err(|err| InfraError::from(err).into())
    }

    /// Register a new feed source. Operator tooling owns source CRUD; the
    /// engine itself only reads sources and stamps sync outcomes.
    pub async fn insert(&self, source: &CalendarSource) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO calendar_sources (
                id, property_id, platform, feed_url, sync_enabled, sync_interval_minutes,
                last_synced_at, last_sync_status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                source.id,
                source.property_id,
                source.platform.as_str(),
                source.feed_url,
                source.sync_enabled,
                source.sync_interval_minutes,
                source.last_synced_at.map(|t| t.timestamp()),
                source.last_sync_status.map(|s| s.as_str()),
                source.created_at.timestamp(),
            ],
        )
        .map_err(InfraError::from)?;

        debug!(source_id = %source.id, platform = %source.platform, "inserted calendar source");
        Ok(())
    }
}

struct SourceRow {
    id: String,
    property_id: String,
    platform: String,
    feed_url: String,
    sync_enabled: bool,
    sync_interval_minutes: i64,
    last_synced_at: Option<i64>,
    last_sync_status: Option<String>,
    created_at: i64,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<SourceRow> {
    Ok(SourceRow {
        id: row.get(0)?,
        property_id: row.get(1)?,
        platform: row.get(2)?,
        feed_url: row.get(3)?,
        sync_enabled: row.get(4)?,
        sync_interval_minutes: row.get(5)?,
        last_synced_at: row.get(6)?,
        last_sync_status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn into_source(row: SourceRow) -> Result<CalendarSource> {
    Ok(CalendarSource {
        platform: row.platform.parse::<Platform>()?,
        last_synced_at: parse_opt_timestamp(row.last_synced_at)?,
        last_sync_status: row
            .last_sync_status
            .as_deref()
            .map(|status| status.parse::<SyncOutcome>())
            .transpose()?,
        created_at: parse_timestamp(row.created_at)?,
        id: row.id,
        property_id: row.property_id,
        feed_url: row.feed_url,
        sync_enabled: row.sync_enabled,
        sync_interval_minutes: row.sync_interval_minutes,
    })
}

#[async_trait]
impl CalendarSourceRepository for SqliteCalendarSourceRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<CalendarSource>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {SOURCE_COLUMNS} FROM calendar_sources WHERE id = ?1"))
            .map_err(InfraError::from)?;
        let mut rows = stmt
            .query_map(params![id], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.pop().map(into_source).transpose()
    }

    async fn find_enabled(&self, property_id: &str) -> Result<Vec<CalendarSource>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SOURCE_COLUMNS} FROM calendar_sources
                 WHERE property_id = ?1 AND sync_enabled = 1
                 ORDER BY created_at ASC"
            ))
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![property_id], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.into_iter().map(into_source).collect()
    }

    #[instrument(skip(self))]
    async fn record_sync_outcome(
        &self,
        source_id: &str,
        at: DateTime<Utc>,
        status: SyncOutcome,
    ) -> Result<()> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE calendar_sources SET last_synced_at = ?2, last_sync_status = ?3
                 WHERE id = ?1",
                params![source_id, at.timestamp(), status.as_str()],
            )
            .map_err(InfraError::from)?;

        if changed == 0 {
            return Err(StaySyncError::NotFound(format!("source {source_id} not found")));
        }
        Ok(())
    }
}
