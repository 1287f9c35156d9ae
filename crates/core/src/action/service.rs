//! Conversion of unresolved conflicts into prioritized remediation actions.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use staysync_domain::constants::{BLOCK_ACTION_EXPIRY_HOURS, CANCEL_ACTION_EXPIRY_HOURS};
use staysync_domain::{
    ActionKind, ActionPriority, ActionStatus, Booking, BookingConflict, Result, StaySyncError,
    SyncAction, TargetPlatform,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::booking::ports::BookingRepository;

use super::ports::SyncActionRepository;

/// Turns freshly detected conflicts into human-actionable recommendations.
///
/// The booking created later in the ledger is treated as the intruder: the
/// earlier reservation has first claim, so the block recommendation targets
/// the later booking's platform.
pub struct ActionAdvisor {
    bookings: Arc<dyn BookingRepository>,
    actions: Arc<dyn SyncActionRepository>,
}

impl ActionAdvisor {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        actions: Arc<dyn SyncActionRepository>,
    ) -> Self {
        Self { bookings, actions }
    }

    /// Create one block action per unresolved conflict that does not already
    /// have a pending action. Returns the actions created.
    pub async fn advise(
        &self,
        conflicts: &[BookingConflict],
        property_id: &str,
    ) -> Result<Vec<SyncAction>> {
        let mut created = Vec::new();

        for conflict in conflicts {
            if conflict.resolved {
                continue;
            }
            if self.actions.find_pending_by_conflict(&conflict.id).await?.is_some() {
                continue;
            }

            let Some(first) = self.bookings.find_by_id(&conflict.booking_id_1).await? else {
                warn!(conflict_id = %conflict.id, "conflict references missing booking, skipping");
                continue;
            };
            let Some(second) = self.bookings.find_by_id(&conflict.booking_id_2).await? else {
                warn!(conflict_id = %conflict.id, "conflict references missing booking, skipping");
                continue;
            };

            let (earlier, later) = order_by_creation(first, second);
            let action = self.create_block_action(conflict, &earlier, &later, property_id).await?;
            info!(
                action_id = %action.id,
                conflict_id = %conflict.id,
                target = %action.target_platform,
                priority = %action.priority,
                "created block recommendation for conflict"
            );
            created.push(action);
        }

        Ok(created)
    }

    /// Recommend cancelling a specific booking on its own platform.
    pub async fn create_cancel_action(
        &self,
        property_id: &str,
        booking: &Booking,
        reason: &str,
        priority: ActionPriority,
    ) -> Result<SyncAction> {
        let action = SyncAction {
            id: Uuid::now_v7().to_string(),
            property_id: property_id.to_string(),
            conflict_id: None,
            trigger_booking_id: Some(booking.id.clone()),
            kind: ActionKind::CancelBooking,
            status: ActionStatus::Pending,
            target_platform: TargetPlatform::for_platform(booking.platform),
            start_date: Some(booking.check_in),
            end_date: Some(booking.check_out),
            reason: reason.to_string(),
            priority,
            expires_after_hours: Some(CANCEL_ACTION_EXPIRY_HOURS),
            created_at: Utc::now(),
            completed_at: None,
            dismissed_at: None,
            user_notes: None,
        };
        self.actions.insert(&action).await?;
        info!(action_id = %action.id, booking_id = %booking.id, "created cancel recommendation");
        Ok(action)
    }

    /// Pending actions for operator display.
    pub async fn pending(&self, property_id: &str) -> Result<Vec<SyncAction>> {
        self.actions.find_pending(property_id).await
    }

    /// Operator marks an action done.
    pub async fn complete(&self, action_id: &str, notes: Option<&str>) -> Result<()> {
        self.require_action(action_id).await?;
        self.actions.mark_completed(action_id, notes, Utc::now()).await
    }

    /// Operator decides not to act.
    pub async fn dismiss(&self, action_id: &str, notes: Option<&str>) -> Result<()> {
        self.require_action(action_id).await?;
        self.actions.mark_dismissed(action_id, notes, Utc::now()).await
    }

    /// Expire stale pending actions. Returns the number expired.
    pub async fn expire_pending(&self) -> Result<usize> {
        let expired = self.actions.expire_pending(Utc::now()).await?;
        if expired > 0 {
            info!(expired, "expired stale pending actions");
        }
        Ok(expired)
    }

    async fn require_action(&self, action_id: &str) -> Result<SyncAction> {
        self.actions
            .find_by_id(action_id)
            .await?
            .ok_or_else(|| StaySyncError::NotFound(format!("sync action {action_id} not found")))
    }

    async fn create_block_action(
        &self,
        conflict: &BookingConflict,
        earlier: &Booking,
        later: &Booking,
        property_id: &str,
    ) -> Result<SyncAction> {
        // The overlap window is always recorded at detection time; the
        // intruder's own dates are only a fallback for legacy rows.
        let start_date = conflict.overlap_start.unwrap_or(later.check_in);
        let end_date = conflict.overlap_end.unwrap_or(later.check_out);
        let severity = conflict.severity();

        let action = SyncAction {
            id: Uuid::now_v7().to_string(),
            property_id: property_id.to_string(),
            conflict_id: Some(conflict.id.clone()),
            trigger_booking_id: Some(later.id.clone()),
            kind: ActionKind::BlockDates,
            status: ActionStatus::Pending,
            target_platform: TargetPlatform::for_platform(later.platform),
            start_date: Some(start_date),
            end_date: Some(end_date),
            reason: block_reason(earlier, later, start_date, end_date, severity.as_str()),
            priority: ActionPriority::from(severity),
            expires_after_hours: Some(BLOCK_ACTION_EXPIRY_HOURS),
            created_at: Utc::now(),
            completed_at: None,
            dismissed_at: None,
            user_notes: None,
        };
        self.actions.insert(&action).await?;
        Ok(action)
    }
}

/// Order two bookings by ledger insertion time, id as tie-breaker (ids are
/// time-ordered UUIDv7 strings).
fn order_by_creation(a: Booking, b: Booking) -> (Booking, Booking) {
    if (a.created_at, &a.id) <= (b.created_at, &b.id) {
        (a, b)
    } else {
        (b, a)
    }
}

fn block_reason(
    earlier: &Booking,
    later: &Booking,
    start_date: NaiveDate,
    end_date: NaiveDate,
    severity: &str,
) -> String {
    format!(
        "Conflict detected!\n\
         Existing reservation: {} ({})\n\
         Conflicts with: {} ({})\n\
         Period: {} - {}\n\
         Severity: {}",
        earlier.guest_name,
        earlier.platform.as_str().to_uppercase(),
        later.guest_name,
        later.platform.as_str().to_uppercase(),
        start_date.format("%d/%m"),
        end_date.format("%d/%m/%Y"),
        severity.to_uppercase(),
    )
}
