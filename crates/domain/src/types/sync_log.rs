//! Append-only history of synchronization passes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StaySyncError;

/// Final status of one sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Success,
    Error,
    Partial,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Success => "success",
            SyncOutcome::Error => "error",
            SyncOutcome::Partial => "partial",
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncOutcome {
    type Err = StaySyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(SyncOutcome::Success),
            "error" => Ok(SyncOutcome::Error),
            "partial" => Ok(SyncOutcome::Partial),
            other => Err(StaySyncError::InvalidInput(format!("unknown sync outcome: {other}"))),
        }
    }
}

/// One record per orchestrator pass over one calendar source.
///
/// Created when the pass starts, finalized exactly once when it completes or
/// fails, and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLog {
    pub id: String,
    pub calendar_source_id: String,
    pub status: SyncOutcome,
    pub bookings_added: i64,
    pub bookings_updated: i64,
    pub bookings_cancelled: i64,
    pub conflicts_detected: i64,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncLog {
    /// Total ledger mutations recorded by this pass.
    pub fn total_changes(&self) -> i64 {
        self.bookings_added + self.bookings_updated + self.bookings_cancelled
    }

    pub fn was_successful(&self) -> bool {
        self.status == SyncOutcome::Success
    }
}
