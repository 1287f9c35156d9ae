//! SQLite-backed implementation of the SyncLogRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Row};
use staysync_core::sync::ports::SyncLogRepository;
use staysync_domain::{Result, StaySyncError, SyncLog, SyncOutcome};
use tracing::instrument;

use crate::errors::InfraError;

use super::{parse_opt_timestamp, parse_timestamp, SqlitePool};

const LOG_COLUMNS: &str = "id, calendar_source_id, status, bookings_added, bookings_updated, \
     bookings_cancelled, conflicts_detected, error_message, duration_ms, started_at, completed_at";

/// SQLite implementation of [`SyncLogRepository`].
pub struct SqliteSyncLogRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteSyncLogRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn connection(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        self.pool.get().map_err(|err| InfraError::from(err).into())
    }
}

struct LogRow {
    id: String,
    calendar_source_id: String,
    status: String,
    bookings_added: i64,
    bookings_updated: i64,
    bookings_cancelled: i64,
    conflicts_detected: i64,
    error_message: Option<String>,
    duration_ms: Option<i64>,
    started_at: i64,
    completed_at: Option<i64>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<LogRow> {
    Ok(LogRow {
        id: row.get(0)?,
        calendar_source_id: row.get(1)?,
        status: row.get(2)?,
        bookings_added: row.get(3)?,
        bookings_updated: row.get(4)?,
        bookings_cancelled: row.get(5)?,
        conflicts_detected: row.get(6)?,
        error_message: row.get(7)?,
        duration_ms: row.get(8)?,
        started_at: row.get(9)?,
        completed_at: row.get(10)?,
    })
}

fn into_log(row: LogRow) -> Result<SyncLog> {
    Ok(SyncLog {
        status: row.status.parse::<SyncOutcome>()?,
        started_at: parse_timestamp(row.started_at)?,
        completed_at: parse_opt_timestamp(row.completed_at)?,
        id: row.id,
        calendar_source_id: row.calendar_source_id,
        bookings_added: row.bookings_added,
        bookings_updated: row.bookings_updated,
        bookings_cancelled: row.bookings_cancelled,
        conflicts_detected: row.conflicts_detected,
        error_message: row.error_message,
        duration_ms: row.duration_ms,
    })
}

#[async_trait]
impl SyncLogRepository for SqliteSyncLogRepository {
    #[instrument(skip(self, log), fields(log_id = %log.id))]
    async fn insert(&self, log: &SyncLog) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO sync_logs (
                id, calendar_source_id, status, bookings_added, bookings_updated,
                bookings_cancelled, conflicts_detected, error_message, duration_ms,
                started_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                log.id,
                log.calendar_source_id,
                log.status.as_str(),
                log.bookings_added,
                log.bookings_updated,
                log.bookings_cancelled,
                log.conflicts_detected,
                log.error_message,
                log.duration_ms,
                log.started_at.timestamp(),
                log.completed_at.map(|t| t.timestamp()),
            ],
        )
        .map_err(InfraError::from)?;
        Ok(())
    }

    #[instrument(skip(self, log), fields(log_id = %log.id))]
    async fn finalize(&self, log: &SyncLog) -> Result<()> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE sync_logs SET
                    status = ?2, bookings_added = ?3, bookings_updated = ?4,
                    bookings_cancelled = ?5, conflicts_detected = ?6, error_message = ?7,
                    duration_ms = ?8, completed_at = ?9
                 WHERE id = ?1",
                params![
                    log.id,
                    log.status.as_str(),
                    log.bookings_added,
                    log.bookings_updated,
                    log.bookings_cancelled,
                    log.conflicts_detected,
                    log.error_message,
                    log.duration_ms,
                    log.completed_at.map(|t| t.timestamp()),
                ],
            )
            .map_err(InfraError::from)?;

        if changed == 0 {
            return Err(StaySyncError::NotFound(format!("sync log {} not found", log.id)));
        }
        Ok(())
    }

    async fn history(&self, calendar_source_id: &str, limit: i64) -> Result<Vec<SyncLog>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {LOG_COLUMNS} FROM sync_logs
                 WHERE calendar_source_id = ?1
                 ORDER BY started_at DESC
                 LIMIT ?2"
            ))
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![calendar_source_id, limit], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.into_iter().map(into_log).collect()
    }

    async fn last(&self, calendar_source_id: &str) -> Result<Option<SyncLog>> {
        Ok(self.history(calendar_source_id, 1).await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use staysync_core::sync::ports::CalendarSourceRepository;
    use staysync_domain::{CalendarSource, Platform};
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::super::{DbManager, SqliteCalendarSourceRepository};
    use super::*;

    async fn setup() -> (SqliteSyncLogRepository, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir");
        let manager =
            DbManager::new(temp_dir.path().join("test.db"), 2).expect("manager created");
        manager.run_migrations().expect("migrations run");

        // Parent source row for the foreign key.
        let sources = SqliteCalendarSourceRepository::new(manager.pool());
        sources
            .insert(&CalendarSource {
                id: "src-1".into(),
                property_id: "prop-1".into(),
                platform: Platform::Airbnb,
                feed_url: "https://example.com/feed.ics".into(),
                sync_enabled: true,
                sync_interval_minutes: 30,
                last_synced_at: None,
                last_sync_status: None,
                created_at: Utc::now(),
            })
            .await
            .expect("insert source");
        assert!(sources.find_by_id("src-1").await.expect("query").is_some());

        (SqliteSyncLogRepository::new(manager.pool()), temp_dir)
    }

    fn log(started_offset_secs: i64) -> SyncLog {
        SyncLog {
            id: Uuid::now_v7().to_string(),
            calendar_source_id: "src-1".into(),
            status: SyncOutcome::Success,
            bookings_added: 0,
            bookings_updated: 0,
            bookings_cancelled: 0,
            conflicts_detected: 0,
            error_message: None,
            duration_ms: None,
            started_at: Utc::now() + Duration::seconds(started_offset_secs),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn finalize_updates_counts_and_completion() {
        let (repo, _temp) = setup().await;
        let mut row = log(0);
        repo.insert(&row).await.expect("insert");

        row.status = SyncOutcome::Error;
        row.bookings_added = 3;
        row.conflicts_detected = 1;
        row.error_message = Some("feed fetch error: 503".into());
        row.duration_ms = Some(420);
        row.completed_at = Some(Utc::now());
        repo.finalize(&row).await.expect("finalize");

        let stored = repo.last("src-1").await.expect("query").expect("log exists");
        assert_eq!(stored.status, SyncOutcome::Error);
        assert_eq!(stored.bookings_added, 3);
        assert_eq!(stored.total_changes(), 3);
        assert_eq!(stored.error_message.as_deref(), Some("feed fetch error: 503"));
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let (repo, _temp) = setup().await;
        let oldest = log(-20);
        let middle = log(-10);
        let newest = log(0);
        for row in [&oldest, &middle, &newest] {
            repo.insert(row).await.expect("insert");
        }

        let history = repo.history("src-1", 2).await.expect("query");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, newest.id);
        assert_eq!(history[1].id, middle.id);
    }

    #[tokio::test]
    async fn finalizing_a_missing_log_is_not_found() {
        let (repo, _temp) = setup().await;
        let err = repo.finalize(&log(0)).await.expect_err("finalize fails");
        assert!(matches!(err, StaySyncError::NotFound(_)));
    }
}
