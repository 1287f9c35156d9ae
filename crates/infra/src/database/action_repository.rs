//! SQLite-backed implementation of the SyncActionRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use staysync_core::action::ports::SyncActionRepository;
use staysync_domain::{
    ActionKind, ActionPriority, ActionStatus, Result, StaySyncError, SyncAction, TargetPlatform,
};
use tracing::{debug, instrument};

use crate::errors::InfraError;

use super::{parse_opt_date, parse_opt_timestamp, parse_timestamp, SqlitePool};

const ACTION_COLUMNS: &str = "id, property_id, conflict_id, trigger_booking_id, action_type, \
     status, target_platform, start_date, end_date, reason, priority, expires_after_hours, \
     created_at, completed_at, dismissed_at, user_notes";

/// SQLite implementation of [`SyncActionRepository`].
pub struct SqliteSyncActionRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteSyncActionRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn connection(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        self.pool.get().map_err(|err| InfraError::from(err).into())
    }
}

struct ActionRow {
    id: String,
    property_id: String,
    conflict_id: Option<String>,
    trigger_booking_id: Option<String>,
    action_type: String,
    status: String,
    target_platform: String,
    start_date: Option<String>,
    end_date: Option<String>,
    reason: String,
    priority: String,
    expires_after_hours: Option<i64>,
    created_at: i64,
    completed_at: Option<i64>,
    dismissed_at: Option<i64>,
    user_notes: Option<String>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<ActionRow> {
    Ok(ActionRow {
        id: row.get(0)?,
        property_id: row.get(1)?,
        conflict_id: row.get(2)?,
        trigger_booking_id: row.get(3)?,
        action_type: row.get(4)?,
        status: row.get(5)?,
        target_platform: row.get(6)?,
        start_date: row.get(7)?,
        end_date: row.get(8)?,
        reason: row.get(9)?,
        priority: row.get(10)?,
        expires_after_hours: row.get(11)?,
        created_at: row.get(12)?,
        completed_at: row.get(13)?,
        dismissed_at: row.get(14)?,
        user_notes: row.get(15)?,
    })
}

fn into_action(row: ActionRow) -> Result<SyncAction> {
    Ok(SyncAction {
        kind: row.action_type.parse::<ActionKind>()?,
        status: row.status.parse::<ActionStatus>()?,
        target_platform: row.target_platform.parse::<TargetPlatform>()?,
        priority: row.priority.parse::<ActionPriority>()?,
        start_date: parse_opt_date(row.start_date)?,
        end_date: parse_opt_date(row.end_date)?,
        created_at: parse_timestamp(row.created_at)?,
        completed_at: parse_opt_timestamp(row.completed_at)?,
        dismissed_at: parse_opt_timestamp(row.dismissed_at)?,
        id: row.id,
        property_id: row.property_id,
        conflict_id: row.conflict_id,
        trigger_booking_id: row.trigger_booking_id,
        reason: row.reason,
        expires_after_hours: row.expires_after_hours,
        user_notes: row.user_notes,
    })
}

#[async_trait]
impl SyncActionRepository for SqliteSyncActionRepository {
    #[instrument(skip(self, action), fields(action_id = %action.id))]
    async fn insert(&self, action: &SyncAction) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO sync_actions (
                id, property_id, conflict_id, trigger_booking_id, action_type, status,
                target_platform, start_date, end_date, reason, priority, expires_after_hours,
                created_at, completed_at, dismissed_at, user_notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                action.id,
                action.property_id,
                action.conflict_id,
                action.trigger_booking_id,
                action.kind.as_str(),
                action.status.as_str(),
                action.target_platform.as_str(),
                action.start_date.map(|d| d.to_string()),
                action.end_date.map(|d| d.to_string()),
                action.reason,
                action.priority.as_str(),
                action.expires_after_hours,
                action.created_at.timestamp(),
                action.completed_at.map(|t| t.timestamp()),
                action.dismissed_at.map(|t| t.timestamp()),
                action.user_notes,
            ],
        )
        .map_err(InfraError::from)?;

        debug!(action_id = %action.id, kind = %action.kind, "inserted sync action");
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<SyncAction>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {ACTION_COLUMNS} FROM sync_actions WHERE id = ?1"))
            .map_err(InfraError::from)?;
        let mut rows = stmt
            .query_map(params![id], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.pop().map(into_action).transpose()
    }

    async fn find_pending(&self, property_id: &str) -> Result<Vec<SyncAction>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ACTION_COLUMNS} FROM sync_actions
                 WHERE property_id = ?1 AND status = 'pending'
                 ORDER BY CASE priority
                     WHEN 'critical' THEN 0
                     WHEN 'high' THEN 1
                     WHEN 'medium' THEN 2
                     ELSE 3
                 END ASC, created_at ASC"
            ))
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![property_id], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.into_iter().map(into_action).collect()
    }

    async fn find_pending_by_conflict(&self, conflict_id: &str) -> Result<Option<SyncAction>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ACTION_COLUMNS} FROM sync_actions
                 WHERE conflict_id = ?1 AND status = 'pending'
                 LIMIT 1"
            ))
            .map_err(InfraError::from)?;
        let mut rows = stmt
            .query_map(params![conflict_id], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.pop().map(into_action).transpose()
    }

    #[instrument(skip(self, notes))]
    async fn mark_completed(
        &self,
        action_id: &str,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE sync_actions
                 SET status = 'completed', completed_at = ?2, user_notes = COALESCE(?3, user_notes)
                 WHERE id = ?1",
                params![action_id, at.timestamp(), notes],
            )
            .map_err(InfraError::from)?;

        if changed == 0 {
            return Err(StaySyncError::NotFound(format!("action {action_id} not found")));
        }
        Ok(())
    }

    #[instrument(skip(self, notes))]
    async fn mark_dismissed(
        &self,
        action_id: &str,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE sync_actions
                 SET status = 'dismissed', dismissed_at = ?2, user_notes = COALESCE(?3, user_notes)
                 WHERE id = ?1",
                params![action_id, at.timestamp(), notes],
            )
            .map_err(InfraError::from)?;

        if changed == 0 {
            return Err(StaySyncError::NotFound(format!("action {action_id} not found")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn expire_pending(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE sync_actions SET status = 'expired'
                 WHERE status = 'pending'
                   AND expires_after_hours IS NOT NULL
                   AND created_at + expires_after_hours * 3600 <= ?1",
                params![now.timestamp()],
            )
            .map_err(InfraError::from)?;

        if changed > 0 {
            debug!(changed, "expired stale pending actions");
        }
        Ok(changed)
    }
}
