//! Normalized feed event, the transient output of the feed parser.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::booking::{BookingStatus, Platform};

/// One normalized reservation event extracted from a calendar feed.
///
/// Never persisted: produced per parse call, consumed by the reconciler and
/// then discarded. The originating feed text survives in `raw_payload` for
/// audit once the event is merged into a [`super::Booking`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    pub external_id: String,
    pub platform: Platform,
    pub status: BookingStatus,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub guest_name: String,
    /// JSON snapshot of the source event fields.
    pub raw_payload: String,
}
