//! Port interface for sync-action persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use staysync_domain::{Result, SyncAction};

/// Trait for persisting and querying operator remediation actions.
#[async_trait]
pub trait SyncActionRepository: Send + Sync {
    async fn insert(&self, action: &SyncAction) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<SyncAction>>;

    /// Pending actions for a property, highest priority first, oldest first
    /// within a priority.
    async fn find_pending(&self, property_id: &str) -> Result<Vec<SyncAction>>;

    /// The pending action already raised for a conflict, if any.
    async fn find_pending_by_conflict(&self, conflict_id: &str) -> Result<Option<SyncAction>>;

    async fn mark_completed(
        &self,
        action_id: &str,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn mark_dismissed(
        &self,
        action_id: &str,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Expire pending actions whose horizon has elapsed as of `now`.
    /// Returns the number of actions expired.
    async fn expire_pending(&self, now: DateTime<Utc>) -> Result<usize>;
}
