//! SQLite-backed implementation of the BookingRepository port.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Row};
use rust_decimal::Decimal;
use staysync_core::booking::ports::{BookingRepository, BookingStatistics};
use staysync_domain::{Booking, BookingStatus, Platform, Result, StaySyncError};
use tracing::{debug, instrument};

use crate::errors::InfraError;

use super::{parse_date, parse_timestamp, SqlitePool};

const BOOKING_COLUMNS: &str = "id, property_id, calendar_source_id, external_id, platform, \
     status, check_in, check_out, nights, guest_name, guest_email, guest_phone, guest_count, \
     total_price, currency, raw_payload, created_at, updated_at";

/// SQLite implementation of [`BookingRepository`].
pub struct SqliteBookingRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteBookingRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn connection(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        self.pool.get().map_err(|err| InfraError::from(err).into())
    }
}

/// Raw column values before enum/date decoding.
struct BookingRow {
    id: String,
    property_id: String,
    calendar_source_id: Option<String>,
    external_id: Option<String>,
    platform: String,
    status: String,
    check_in: String,
    check_out: String,
    nights: i64,
    guest_name: String,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    guest_count: i64,
    total_price: Option<String>,
    currency: String,
    raw_payload: Option<String>,
    created_at: i64,
    updated_at: i64,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<BookingRow> {
    Ok(BookingRow {
        id: row.get(0)?,
        property_id: row.get(1)?,
        calendar_source_id: row.get(2)?,
        external_id: row.get(3)?,
        platform: row.get(4)?,
        status: row.get(5)?,
        check_in: row.get(6)?,
        check_out: row.get(7)?,
        nights: row.get(8)?,
        guest_name: row.get(9)?,
        guest_email: row.get(10)?,
        guest_phone: row.get(11)?,
        guest_count: row.get(12)?,
        total_price: row.get(13)?,
        currency: row.get(14)?,
        raw_payload: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn into_booking(row: BookingRow) -> Result<Booking> {
    let total_price = row
        .total_price
        .as_deref()
        .map(|value| {
            Decimal::from_str(value).map_err(|err| {
                StaySyncError::Database(format!("invalid stored price '{value}': {err}"))
            })
        })
        .transpose()?;

    Ok(Booking {
        platform: row.platform.parse::<Platform>()?,
        status: row.status.parse::<BookingStatus>()?,
        check_in: parse_date(&row.check_in)?,
        check_out: parse_date(&row.check_out)?,
        created_at: parse_timestamp(row.created_at)?,
        updated_at: parse_timestamp(row.updated_at)?,
        total_price,
        id: row.id,
        property_id: row.property_id,
        calendar_source_id: row.calendar_source_id,
        external_id: row.external_id,
        nights: row.nights,
        guest_name: row.guest_name,
        guest_email: row.guest_email,
        guest_phone: row.guest_phone,
        guest_count: row.guest_count,
        currency: row.currency,
        raw_payload: row.raw_payload,
    })
}

fn collect_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>> {
    rows.into_iter().map(into_booking).collect()
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    #[instrument(skip(self, booking), fields(booking_id = %booking.id))]
    async fn insert(&self, booking: &Booking) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO bookings (
                id, property_id, calendar_source_id, external_id, platform, status,
                check_in, check_out, nights, guest_name, guest_email, guest_phone,
                guest_count, total_price, currency, raw_payload, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                booking.id,
                booking.property_id,
                booking.calendar_source_id,
                booking.external_id,
                booking.platform.as_str(),
                booking.status.as_str(),
                booking.check_in.to_string(),
                booking.check_out.to_string(),
                booking.nights,
                booking.guest_name,
                booking.guest_email,
                booking.guest_phone,
                booking.guest_count,
                booking.total_price.map(|price| price.to_string()),
                booking.currency,
                booking.raw_payload,
                booking.created_at.timestamp(),
                booking.updated_at.timestamp(),
            ],
        )
        .map_err(InfraError::from)?;

        debug!(booking_id = %booking.id, "inserted booking");
        Ok(())
    }

    #[instrument(skip(self, booking), fields(booking_id = %booking.id))]
    async fn update(&self, booking: &Booking) -> Result<()> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE bookings SET
                    calendar_source_id = ?2, external_id = ?3, platform = ?4, status = ?5,
                    check_in = ?6, check_out = ?7, nights = ?8, guest_name = ?9,
                    guest_email = ?10, guest_phone = ?11, guest_count = ?12,
                    total_price = ?13, currency = ?14, raw_payload = ?15, updated_at = ?16
                 WHERE id = ?1",
                params![
                    booking.id,
                    booking.calendar_source_id,
                    booking.external_id,
                    booking.platform.as_str(),
                    booking.status.as_str(),
                    booking.check_in.to_string(),
                    booking.check_out.to_string(),
                    booking.nights,
                    booking.guest_name,
                    booking.guest_email,
                    booking.guest_phone,
                    booking.guest_count,
                    booking.total_price.map(|price| price.to_string()),
                    booking.currency,
                    booking.raw_payload,
                    booking.updated_at.timestamp(),
                ],
            )
            .map_err(InfraError::from)?;

        if changed == 0 {
            return Err(StaySyncError::NotFound(format!("booking {} not found", booking.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"))
            .map_err(InfraError::from)?;
        let mut rows = stmt
            .query_map(params![id], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.pop().map(into_booking).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
        platform: Platform,
        property_id: &str,
    ) -> Result<Option<Booking>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE external_id = ?1 AND platform = ?2 AND property_id = ?3"
            ))
            .map_err(InfraError::from)?;
        let mut rows = stmt
            .query_map(params![external_id, platform.as_str(), property_id], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.pop().map(into_booking).transpose()
    }

    async fn find_confirmed(&self, property_id: &str) -> Result<Vec<Booking>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE property_id = ?1 AND status = 'confirmed'
                 ORDER BY check_in ASC"
            ))
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![property_id], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        collect_bookings(rows)
    }

    async fn find_active(&self, property_id: &str, today: NaiveDate) -> Result<Vec<Booking>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE property_id = ?1 AND status = 'confirmed' AND check_out >= ?2
                 ORDER BY check_in ASC"
            ))
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![property_id, today.to_string()], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        collect_bookings(rows)
    }

    async fn find_overlapping(
        &self,
        property_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<&str>,
    ) -> Result<Vec<Booking>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE property_id = ?1 AND status = 'confirmed'
                   AND check_in < ?2 AND check_out > ?3
                   AND (?4 IS NULL OR id <> ?4)
                 ORDER BY check_in ASC"
            ))
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(
                params![property_id, end.to_string(), start.to_string(), exclude_id],
                read_row,
            )
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        collect_bookings(rows)
    }

    async fn find_current(&self, property_id: &str, today: NaiveDate) -> Result<Option<Booking>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE property_id = ?1 AND status = 'confirmed'
                   AND check_in <= ?2 AND check_out > ?2
                 LIMIT 1"
            ))
            .map_err(InfraError::from)?;
        let mut rows = stmt
            .query_map(params![property_id, today.to_string()], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.pop().map(into_booking).transpose()
    }

    async fn find_upcoming(
        &self,
        property_id: &str,
        today: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Booking>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE property_id = ?1 AND status = 'confirmed' AND check_in >= ?2
                 ORDER BY check_in ASC
                 LIMIT ?3"
            ))
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![property_id, today.to_string(), limit], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        collect_bookings(rows)
    }

    #[instrument(skip(self))]
    async fn mark_completed_before(&self, property_id: &str, today: NaiveDate) -> Result<usize> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE bookings SET status = 'completed', updated_at = ?3
                 WHERE property_id = ?1 AND status = 'confirmed' AND check_out < ?2",
                params![property_id, today.to_string(), Utc::now().timestamp()],
            )
            .map_err(InfraError::from)?;

        if changed > 0 {
            debug!(property_id, changed, "marked past bookings as completed");
        }
        Ok(changed)
    }

    async fn status_counts(&self, property_id: &str) -> Result<BookingStatistics> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT status, COUNT(*) FROM bookings WHERE property_id = ?1 GROUP BY status",
            )
            .map_err(InfraError::from)?;
        let counts = stmt
            .query_map(params![property_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;

        let mut stats = BookingStatistics::default();
        for (status, count) in counts {
            stats.total += count;
            match status.parse::<BookingStatus>()? {
                BookingStatus::Confirmed => stats.confirmed = count,
                BookingStatus::Completed => stats.completed = count,
                BookingStatus::Cancelled => stats.cancelled = count,
                BookingStatus::Blocked => stats.blocked = count,
            }
        }
        Ok(stats)
    }
}
