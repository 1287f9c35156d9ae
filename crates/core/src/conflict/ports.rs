//! Port interface for conflict persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use staysync_domain::{BookingConflict, Result};

/// Trait for persisting and querying booking conflicts.
///
/// Implementations must enforce the invariant that at most one *unresolved*
/// conflict exists per canonical `(booking_id_1, booking_id_2, kind)`
/// triple, surfacing violations as
/// [`staysync_domain::StaySyncError::UniqueViolation`] so callers can
/// recover from concurrent-detection races.
#[async_trait]
pub trait ConflictRepository: Send + Sync {
    /// Insert a new conflict row. The booking pair must already be in
    /// canonical order (see [`BookingConflict::canonical_pair`]).
    async fn insert(&self, conflict: &BookingConflict) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<BookingConflict>>;

    /// The unresolved conflict for an unordered booking pair, if any.
    /// Accepts the pair in either order.
    async fn find_unresolved_pair(
        &self,
        booking_id_a: &str,
        booking_id_b: &str,
    ) -> Result<Option<BookingConflict>>;

    /// All unresolved conflicts whose participants belong to the property.
    async fn find_unresolved_for_property(&self, property_id: &str)
        -> Result<Vec<BookingConflict>>;

    /// Mark a conflict resolved with operator or auto-resolution notes.
    async fn resolve(
        &self,
        conflict_id: &str,
        notes: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<()>;
}
