//! Feed-event reconciliation against the booking ledger.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use staysync_domain::constants::DEFAULT_CURRENCY;
use staysync_domain::{Booking, BookingEvent, BookingStatus, Result};
use tracing::{debug, info};
use uuid::Uuid;

use super::ports::{BookingRepository, BookingStatistics};

/// How one feed event affected the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Created,
    Updated,
    Cancelled,
    Unchanged,
}

impl MergeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeOutcome::Created => "created",
            MergeOutcome::Updated => "updated",
            MergeOutcome::Cancelled => "cancelled",
            MergeOutcome::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merges normalized feed events into the canonical booking ledger.
///
/// The merge is event-idempotent: feeding the same document twice yields
/// [`MergeOutcome::Unchanged`] for every booking on the second pass and
/// never creates duplicate rows.
pub struct ReconciliationService {
    bookings: Arc<dyn BookingRepository>,
}

impl ReconciliationService {
    pub fn new(bookings: Arc<dyn BookingRepository>) -> Self {
        Self { bookings }
    }

    /// Merge one feed event, classifying the effect on the ledger.
    ///
    /// Lookup is by `(external_id, platform, property_id)`. A cancellation
    /// reported for a live booking wins over any field diff; otherwise the
    /// stay dates and guest name are diffed and applied, refreshing the raw
    /// payload and night count alongside.
    pub async fn merge_event(
        &self,
        event: &BookingEvent,
        calendar_source_id: &str,
        property_id: &str,
    ) -> Result<(Booking, MergeOutcome)> {
        let existing = self
            .bookings
            .find_by_external_id(&event.external_id, event.platform, property_id)
            .await?;

        let Some(mut booking) = existing else {
            let booking = self.create_from_event(event, calendar_source_id, property_id).await?;
            info!(
                booking_id = %booking.id,
                guest = %booking.guest_name,
                check_in = %booking.check_in,
                "booking created from feed event"
            );
            return Ok((booking, MergeOutcome::Created));
        };

        if event.status == BookingStatus::Cancelled && booking.status != BookingStatus::Cancelled {
            booking.status = BookingStatus::Cancelled;
            booking.updated_at = Utc::now();
            self.bookings.update(&booking).await?;
            info!(booking_id = %booking.id, guest = %booking.guest_name, "booking cancelled by feed");
            return Ok((booking, MergeOutcome::Cancelled));
        }

        let changed = booking.check_in != event.check_in
            || booking.check_out != event.check_out
            || booking.guest_name != event.guest_name;

        if !changed {
            debug!(booking_id = %booking.id, "feed event matches ledger, no changes");
            return Ok((booking, MergeOutcome::Unchanged));
        }

        booking.check_in = event.check_in;
        booking.check_out = event.check_out;
        booking.guest_name = event.guest_name.clone();
        booking.nights = event.nights;
        booking.raw_payload = Some(event.raw_payload.clone());
        booking.updated_at = Utc::now();
        self.bookings.update(&booking).await?;
        info!(booking_id = %booking.id, guest = %booking.guest_name, "booking updated from feed event");
        Ok((booking, MergeOutcome::Updated))
    }

    /// Maintenance pass: flip confirmed bookings whose stay has ended to
    /// `completed`.
    pub async fn mark_completed(&self, property_id: &str, today: NaiveDate) -> Result<usize> {
        let count = self.bookings.mark_completed_before(property_id, today).await?;
        if count > 0 {
            info!(property_id, count, "marked past bookings as completed");
        }
        Ok(count)
    }

    /// Per-status booking counts for reporting surfaces.
    pub async fn statistics(&self, property_id: &str) -> Result<BookingStatistics> {
        self.bookings.status_counts(property_id).await
    }

    async fn create_from_event(
        &self,
        event: &BookingEvent,
        calendar_source_id: &str,
        property_id: &str,
    ) -> Result<Booking> {
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::now_v7().to_string(),
            property_id: property_id.to_string(),
            calendar_source_id: Some(calendar_source_id.to_string()),
            external_id: Some(event.external_id.clone()),
            platform: event.platform,
            status: event.status,
            check_in: event.check_in,
            check_out: event.check_out,
            nights: event.nights,
            guest_name: event.guest_name.clone(),
            guest_email: None,
            guest_phone: None,
            guest_count: 1,
            total_price: None,
            currency: DEFAULT_CURRENCY.to_string(),
            raw_payload: Some(event.raw_payload.clone()),
            created_at: now,
            updated_at: now,
        };
        self.bookings.insert(&booking).await?;
        Ok(booking)
    }
}
