//! SQLite-backed implementation of the ConflictRepository port.
//!
//! The `uq_conflict_pair` partial unique index guarantees at most one
//! unresolved conflict per canonical pair and kind; violations surface as
//! [`StaySyncError::UniqueViolation`] so the detector can recover by
//! re-reading the winning row.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use staysync_core::conflict::ports::ConflictRepository;
use staysync_domain::{BookingConflict, ConflictKind, Result, StaySyncError};
use tracing::{debug, instrument};

use crate::errors::InfraError;

use super::{parse_opt_date, parse_opt_timestamp, parse_timestamp, SqlitePool};

const CONFLICT_COLUMNS: &str = "id, booking_id_1, booking_id_2, conflict_type, overlap_start, \
     overlap_end, resolved, resolution_notes, detected_at, resolved_at";

/// SQLite implementation of [`ConflictRepository`].
pub struct SqliteConflictRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteConflictRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn connection(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        self.pool.get().map_err(|err| InfraError::from(err).into())
    }
}

struct ConflictRow {
    id: String,
    booking_id_1: String,
    booking_id_2: String,
    conflict_type: String,
    overlap_start: Option<String>,
    overlap_end: Option<String>,
    resolved: bool,
    resolution_notes: Option<String>,
    detected_at: i64,
    resolved_at: Option<i64>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<ConflictRow> {
    Ok(ConflictRow {
        id: row.get(0)?,
        booking_id_1: row.get(1)?,
        booking_id_2: row.get(2)?,
        conflict_type: row.get(3)?,
        overlap_start: row.get(4)?,
        overlap_end: row.get(5)?,
        resolved: row.get(6)?,
        resolution_notes: row.get(7)?,
        detected_at: row.get(8)?,
        resolved_at: row.get(9)?,
    })
}

fn into_conflict(row: ConflictRow) -> Result<BookingConflict> {
    Ok(BookingConflict {
        kind: row.conflict_type.parse::<ConflictKind>()?,
        overlap_start: parse_opt_date(row.overlap_start)?,
        overlap_end: parse_opt_date(row.overlap_end)?,
        detected_at: parse_timestamp(row.detected_at)?,
        resolved_at: parse_opt_timestamp(row.resolved_at)?,
        id: row.id,
        booking_id_1: row.booking_id_1,
        booking_id_2: row.booking_id_2,
        resolved: row.resolved,
        resolution_notes: row.resolution_notes,
    })
}

#[async_trait]
impl ConflictRepository for SqliteConflictRepository {
    #[instrument(skip(self, conflict), fields(conflict_id = %conflict.id))]
    async fn insert(&self, conflict: &BookingConflict) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO booking_conflicts (
                id, booking_id_1, booking_id_2, conflict_type, overlap_start, overlap_end,
                resolved, resolution_notes, detected_at, resolved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                conflict.id,
                conflict.booking_id_1,
                conflict.booking_id_2,
                conflict.kind.as_str(),
                conflict.overlap_start.map(|d| d.to_string()),
                conflict.overlap_end.map(|d| d.to_string()),
                conflict.resolved,
                conflict.resolution_notes,
                conflict.detected_at.timestamp(),
                conflict.resolved_at.map(|t| t.timestamp()),
            ],
        )
        .map_err(InfraError::from)?;

        debug!(conflict_id = %conflict.id, kind = %conflict.kind, "inserted conflict");
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<BookingConflict>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {CONFLICT_COLUMNS} FROM booking_conflicts WHERE id = ?1"))
            .map_err(InfraError::from)?;
        let mut rows = stmt
            .query_map(params![id], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.pop().map(into_conflict).transpose()
    }

    async fn find_unresolved_pair(
        &self,
        booking_id_a: &str,
        booking_id_b: &str,
    ) -> Result<Option<BookingConflict>> {
        let (id1, id2) = BookingConflict::canonical_pair(booking_id_a, booking_id_b);
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CONFLICT_COLUMNS} FROM booking_conflicts
                 WHERE resolved = 0 AND booking_id_1 = ?1 AND booking_id_2 = ?2
                 LIMIT 1"
            ))
            .map_err(InfraError::from)?;
        let mut rows = stmt
            .query_map(params![id1, id2], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.pop().map(into_conflict).transpose()
    }

    async fn find_unresolved_for_property(
        &self,
        property_id: &str,
    ) -> Result<Vec<BookingConflict>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT c.id, c.booking_id_1, c.booking_id_2, c.conflict_type, c.overlap_start,
                        c.overlap_end, c.resolved, c.resolution_notes, c.detected_at, c.resolved_at
                 FROM booking_conflicts c
                 JOIN bookings b ON c.booking_id_1 = b.id
                 WHERE b.property_id = ?1 AND c.resolved = 0
                 ORDER BY c.detected_at ASC",
            )
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![property_id], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.into_iter().map(into_conflict).collect()
    }

    #[instrument(skip(self, notes))]
    async fn resolve(
        &self,
        conflict_id: &str,
        notes: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE booking_conflicts
                 SET resolved = 1, resolution_notes = ?2, resolved_at = ?3
                 WHERE id = ?1",
                params![conflict_id, notes, resolved_at.timestamp()],
            )
            .map_err(InfraError::from)?;

        if changed == 0 {
            return Err(StaySyncError::NotFound(format!("conflict {conflict_id} not found")));
        }
        debug!(conflict_id, "conflict resolved");
        Ok(())
    }
}
