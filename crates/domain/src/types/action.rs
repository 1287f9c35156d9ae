//! Operator-facing remediation actions generated from conflicts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::booking::Platform;
use super::conflict::ConflictSeverity;
use crate::errors::StaySyncError;

/// Kind of manual remediation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    BlockDates,
    UnblockDates,
    CancelBooking,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::BlockDates => "block_dates",
            ActionKind::UnblockDates => "unblock_dates",
            ActionKind::CancelBooking => "cancel_booking",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = StaySyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block_dates" => Ok(ActionKind::BlockDates),
            "unblock_dates" => Ok(ActionKind::UnblockDates),
            "cancel_booking" => Ok(ActionKind::CancelBooking),
            other => Err(StaySyncError::InvalidInput(format!("unknown action kind: {other}"))),
        }
    }
}

/// Lifecycle status of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Waiting for the operator to act.
    Pending,
    Completed,
    Dismissed,
    /// Expired unattended past its horizon.
    Expired,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Completed => "completed",
            ActionStatus::Dismissed => "dismissed",
            ActionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = StaySyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ActionStatus::Pending),
            "completed" => Ok(ActionStatus::Completed),
            "dismissed" => Ok(ActionStatus::Dismissed),
            "expired" => Ok(ActionStatus::Expired),
            other => Err(StaySyncError::InvalidInput(format!("unknown action status: {other}"))),
        }
    }
}

/// Platform the operator must act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPlatform {
    Airbnb,
    Booking,
    Both,
}

impl TargetPlatform {
    /// Map the intruding booking's platform to the recommendation target.
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Airbnb => TargetPlatform::Airbnb,
            _ => TargetPlatform::Booking,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPlatform::Airbnb => "airbnb",
            TargetPlatform::Booking => "booking",
            TargetPlatform::Both => "both",
        }
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetPlatform {
    type Err = StaySyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "airbnb" => Ok(TargetPlatform::Airbnb),
            "booking" => Ok(TargetPlatform::Booking),
            "both" => Ok(TargetPlatform::Both),
            other => Err(StaySyncError::InvalidInput(format!("unknown target platform: {other}"))),
        }
    }
}

/// Action urgency; mirrors the severity of the conflict that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl ActionPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPriority::Low => "low",
            ActionPriority::Medium => "medium",
            ActionPriority::High => "high",
            ActionPriority::Critical => "critical",
        }
    }
}

impl From<ConflictSeverity> for ActionPriority {
    fn from(severity: ConflictSeverity) -> Self {
        match severity {
            ConflictSeverity::Low => ActionPriority::Low,
            ConflictSeverity::Medium => ActionPriority::Medium,
            ConflictSeverity::High => ActionPriority::High,
            ConflictSeverity::Critical => ActionPriority::Critical,
        }
    }
}

impl fmt::Display for ActionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionPriority {
    type Err = StaySyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(ActionPriority::Low),
            "medium" => Ok(ActionPriority::Medium),
            "high" => Ok(ActionPriority::High),
            "critical" => Ok(ActionPriority::Critical),
            other => Err(StaySyncError::InvalidInput(format!("unknown action priority: {other}"))),
        }
    }
}

/// An operator-facing remediation task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAction {
    pub id: String,
    pub property_id: String,
    /// Conflict this action remediates, when conflict-triggered.
    pub conflict_id: Option<String>,
    /// Booking whose arrival triggered the recommendation.
    pub trigger_booking_id: Option<String>,
    pub kind: ActionKind,
    pub status: ActionStatus,
    pub target_platform: TargetPlatform,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Human-readable explanation shown to the operator.
    pub reason: String,
    pub priority: ActionPriority,
    /// Hours after creation at which a still-pending action expires;
    /// `None` means the action never expires on its own.
    pub expires_after_hours: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub user_notes: Option<String>,
}

impl SyncAction {
    pub fn is_pending(&self) -> bool {
        self.status == ActionStatus::Pending
    }

    /// Whether the expiry horizon has elapsed for a still-pending action.
    pub fn should_expire(&self, now: DateTime<Utc>) -> bool {
        let Some(hours) = self.expires_after_hours else {
            return false;
        };
        self.status == ActionStatus::Pending
            && now - self.created_at >= chrono::Duration::hours(hours)
    }
}
