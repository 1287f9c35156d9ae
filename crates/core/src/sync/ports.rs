//! Port interfaces for calendar sources and the sync history log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use staysync_domain::{CalendarSource, Result, SyncLog, SyncOutcome};

/// Trait for reading and updating calendar source configuration.
#[async_trait]
pub trait CalendarSourceRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<CalendarSource>>;

    /// Sync-enabled sources for a property.
    async fn find_enabled(&self, property_id: &str) -> Result<Vec<CalendarSource>>;

    /// Record the timestamp and status of the latest sync pass.
    async fn record_sync_outcome(
        &self,
        source_id: &str,
        at: DateTime<Utc>,
        status: SyncOutcome,
    ) -> Result<()>;
}

/// Trait for the append-only sync pass history.
#[async_trait]
pub trait SyncLogRepository: Send + Sync {
    /// Insert the log row opened at the start of a pass.
    async fn insert(&self, log: &SyncLog) -> Result<()>;

    /// Persist the finalized state of a completed or failed pass.
    async fn finalize(&self, log: &SyncLog) -> Result<()>;

    /// Most recent logs for a source, newest first.
    async fn history(&self, calendar_source_id: &str, limit: i64) -> Result<Vec<SyncLog>>;

    /// The most recent log for a source.
    async fn last(&self, calendar_source_id: &str) -> Result<Option<SyncLog>>;
}
