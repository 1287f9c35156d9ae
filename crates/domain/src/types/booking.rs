//! Canonical booking record and its closed status/platform enums.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::StaySyncError;
use crate::utils::dates;

/// Originating reservation platform of a calendar source or booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Airbnb,
    Booking,
    Manual,
    Other,
}

impl Platform {
    /// Stable string tag used in storage and feed handling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Airbnb => "airbnb",
            Platform::Booking => "booking",
            Platform::Manual => "manual",
            Platform::Other => "other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = StaySyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "airbnb" => Ok(Platform::Airbnb),
            "booking" => Ok(Platform::Booking),
            "manual" => Ok(Platform::Manual),
            "other" => Ok(Platform::Other),
            other => Err(StaySyncError::InvalidInput(format!("unknown platform tag: {other}"))),
        }
    }
}

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
    /// Manual block of the calendar rather than a guest stay.
    Blocked,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = StaySyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            "blocked" => Ok(BookingStatus::Blocked),
            other => Err(StaySyncError::InvalidInput(format!("unknown booking status: {other}"))),
        }
    }
}

/// Canonical occupancy record in the booking ledger.
///
/// Invariants: `check_out > check_in` and `nights` equals the day difference
/// between the two. `(external_id, platform, property_id)` is the natural
/// merge key whenever `external_id` is present; manual bookings carry no
/// external identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub property_id: String,
    /// Feed this booking was reconciled from; `None` for manual entries.
    pub calendar_source_id: Option<String>,
    /// Reservation identifier on the external platform.
    pub external_id: Option<String>,
    pub platform: Platform,
    pub status: BookingStatus,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub guest_name: String,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_count: i64,
    pub total_price: Option<Decimal>,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Raw source payload kept verbatim for audit.
    pub raw_payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Number of nights implied by the stay dates.
    pub fn duration_nights(&self) -> i64 {
        dates::nights_between(self.check_in, self.check_out)
    }

    /// Half-open overlap test against another date range.
    pub fn overlaps(&self, other_check_in: NaiveDate, other_check_out: NaiveDate) -> bool {
        dates::dates_overlap(self.check_in, self.check_out, other_check_in, other_check_out)
    }

    /// Confirmed and not yet ended as of `today`.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.status == BookingStatus::Confirmed && self.check_out >= today
    }
}
