//! Booking conflict records and severity classification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StaySyncError;

/// Kind of inconsistency detected between two bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Two distinct stays claim overlapping nights.
    Overlap,
    /// The same real-world stay reported by two platforms.
    Duplicate,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::Overlap => "overlap",
            ConflictKind::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictKind {
    type Err = StaySyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overlap" => Ok(ConflictKind::Overlap),
            "duplicate" => Ok(ConflictKind::Duplicate),
            other => Err(StaySyncError::InvalidInput(format!("unknown conflict kind: {other}"))),
        }
    }
}

/// Derived conflict severity; never stored, always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConflictSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictSeverity::Low => "low",
            ConflictSeverity::Medium => "medium",
            ConflictSeverity::High => "high",
            ConflictSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected inconsistency between exactly two bookings.
///
/// The pair is unordered but stored canonically ordered (smaller id first)
/// so the `(booking_id_1, booking_id_2, conflict_type)` uniqueness
/// constraint catches `(A,B)` / `(B,A)` duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConflict {
    pub id: String,
    pub booking_id_1: String,
    pub booking_id_2: String,
    pub kind: ConflictKind,
    pub overlap_start: Option<NaiveDate>,
    pub overlap_end: Option<NaiveDate>,
    pub resolved: bool,
    pub resolution_notes: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl BookingConflict {
    /// Canonical storage order for an unordered booking pair.
    pub fn canonical_pair(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    /// Whether the given booking participates in this conflict.
    pub fn involves(&self, booking_id: &str) -> bool {
        self.booking_id_1 == booking_id || self.booking_id_2 == booking_id
    }

    /// Nights covered by the overlap window; 0 when no window is recorded.
    pub fn overlap_nights(&self) -> i64 {
        match (self.overlap_start, self.overlap_end) {
            (Some(start), Some(end)) => (end - start).num_days(),
            _ => 0,
        }
    }

    /// Severity ladder: duplicates are always high; overlaps scale with the
    /// number of conflicting nights.
    pub fn severity(&self) -> ConflictSeverity {
        match self.kind {
            ConflictKind::Duplicate => ConflictSeverity::High,
            ConflictKind::Overlap => match self.overlap_nights() {
                n if n >= 7 => ConflictSeverity::Critical,
                n if n >= 3 => ConflictSeverity::High,
                n if n >= 1 => ConflictSeverity::Medium,
                _ => ConflictSeverity::Low,
            },
        }
    }
}
