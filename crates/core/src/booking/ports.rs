//! Port interfaces for the booking ledger.
//!
//! These traits define the boundary between the reconciliation logic and
//! the persistence layer that owns the canonical booking records.

use async_trait::async_trait;
use chrono::NaiveDate;
use staysync_domain::{Booking, Platform, Result};

/// Per-status booking counts for one property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingStatistics {
    pub total: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub blocked: i64,
}

/// Trait for persisting and querying canonical bookings.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a new booking row.
    async fn insert(&self, booking: &Booking) -> Result<()>;

    /// Persist the full current state of an existing booking.
    async fn update(&self, booking: &Booking) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>>;

    /// Look up a booking by its natural merge key.
    async fn find_by_external_id(
        &self,
        external_id: &str,
        platform: Platform,
        property_id: &str,
    ) -> Result<Option<Booking>>;

    /// All confirmed bookings for a property, ordered by check-in date.
    async fn find_confirmed(&self, property_id: &str) -> Result<Vec<Booking>>;

    /// Confirmed bookings that have not yet ended as of `today`, ordered by
    /// check-in date.
    async fn find_active(&self, property_id: &str, today: NaiveDate) -> Result<Vec<Booking>>;

    /// Confirmed bookings whose stay overlaps the half-open `[start, end)`
    /// range, optionally excluding one booking id.
    async fn find_overlapping(
        &self,
        property_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<&str>,
    ) -> Result<Vec<Booking>>;

    /// The booking currently in-house, if any.
    async fn find_current(&self, property_id: &str, today: NaiveDate) -> Result<Option<Booking>>;

    /// The next `limit` upcoming confirmed bookings.
    async fn find_upcoming(
        &self,
        property_id: &str,
        today: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Booking>>;

    /// Flip confirmed bookings whose check-out date has passed to
    /// `completed`. Returns the number of rows changed.
    async fn mark_completed_before(&self, property_id: &str, today: NaiveDate) -> Result<usize>;

    /// Per-status booking counts.
    async fn status_counts(&self, property_id: &str) -> Result<BookingStatistics>;
}
