//! Calendar feed source configuration and bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::booking::Platform;
use super::sync_log::SyncOutcome;

/// One external calendar feed attached to a property.
///
/// Created by an operator; only the orchestrator mutates the last-sync
/// bookkeeping fields after each pass. Sources are never deleted
/// automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSource {
    pub id: String,
    pub property_id: String,
    pub platform: Platform,
    pub feed_url: String,
    pub sync_enabled: bool,
    pub sync_interval_minutes: i64,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_sync_status: Option<SyncOutcome>,
    pub created_at: DateTime<Utc>,
}
