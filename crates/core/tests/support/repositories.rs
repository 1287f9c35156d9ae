//! In-memory mock repositories for testing.
//!
//! One [`InMemoryLedger`] implements all core repository ports, enabling
//! deterministic unit tests without a database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use staysync_core::booking::ports::{BookingRepository, BookingStatistics};
use staysync_core::conflict::ports::ConflictRepository;
use staysync_core::action::ports::SyncActionRepository;
use staysync_core::sync::ports::{CalendarSourceRepository, SyncLogRepository};
use staysync_domain::{
    ActionStatus, Booking, BookingConflict, BookingStatus, CalendarSource, Platform,
    Result as DomainResult, StaySyncError, SyncAction, SyncLog, SyncOutcome,
};
use uuid::Uuid;

/// In-memory ledger backing every repository port.
#[derive(Default)]
pub struct InMemoryLedger {
    pub bookings: Mutex<Vec<Booking>>,
    pub conflicts: Mutex<Vec<BookingConflict>>,
    pub actions: Mutex<Vec<SyncAction>>,
    pub logs: Mutex<Vec<SyncLog>>,
    pub sources: Mutex<Vec<CalendarSource>>,
}

impl InMemoryLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_source(&self, source: CalendarSource) {
        self.sources.lock().unwrap().push(source);
    }

    pub fn booking_rows(&self) -> Vec<Booking> {
        self.bookings.lock().unwrap().clone()
    }

    pub fn conflict_rows(&self) -> Vec<BookingConflict> {
        self.conflicts.lock().unwrap().clone()
    }

    pub fn action_rows(&self) -> Vec<SyncAction> {
        self.actions.lock().unwrap().clone()
    }

    pub fn log_rows(&self) -> Vec<SyncLog> {
        self.logs.lock().unwrap().clone()
    }

    pub fn source_rows(&self) -> Vec<CalendarSource> {
        self.sources.lock().unwrap().clone()
    }
}

#[async_trait]
impl BookingRepository for InMemoryLedger {
    async fn insert(&self, booking: &Booking) -> DomainResult<()> {
        self.bookings.lock().unwrap().push(booking.clone());
        Ok(())
    }

    async fn update(&self, booking: &Booking) -> DomainResult<()> {
        let mut bookings = self.bookings.lock().unwrap();
        match bookings.iter_mut().find(|b| b.id == booking.id) {
            Some(slot) => {
                *slot = booking.clone();
                Ok(())
            }
            None => Err(StaySyncError::NotFound(format!("booking {} not found", booking.id))),
        }
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Booking>> {
        Ok(self.bookings.lock().unwrap().iter().find(|b| b.id == id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
        platform: Platform,
        property_id: &str,
    ) -> DomainResult<Option<Booking>> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .find(|b| {
                b.external_id.as_deref() == Some(external_id)
                    && b.platform == platform
                    && b.property_id == property_id
            })
            .cloned())
    }

    async fn find_confirmed(&self, property_id: &str) -> DomainResult<Vec<Booking>> {
        let mut confirmed: Vec<Booking> = self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.property_id == property_id && b.status == BookingStatus::Confirmed)
            .cloned()
            .collect();
        confirmed.sort_by_key(|b| b.check_in);
        Ok(confirmed)
    }

    async fn find_active(
        &self,
        property_id: &str,
        today: NaiveDate,
    ) -> DomainResult<Vec<Booking>> {
        let mut active: Vec<Booking> = self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.property_id == property_id && b.is_active(today))
            .cloned()
            .collect();
        active.sort_by_key(|b| b.check_in);
        Ok(active)
    }

    async fn find_overlapping(
        &self,
        property_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<&str>,
    ) -> DomainResult<Vec<Booking>> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| {
                b.property_id == property_id
                    && b.status == BookingStatus::Confirmed
                    && b.overlaps(start, end)
                    && exclude_id != Some(b.id.as_str())
            })
            .cloned()
            .collect())
    }

    async fn find_current(
        &self,
        property_id: &str,
        today: NaiveDate,
    ) -> DomainResult<Option<Booking>> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .find(|b| {
                b.property_id == property_id
                    && b.status == BookingStatus::Confirmed
                    && b.check_in <= today
                    && b.check_out > today
            })
            .cloned())
    }

    async fn find_upcoming(
        &self,
        property_id: &str,
        today: NaiveDate,
        limit: i64,
    ) -> DomainResult<Vec<Booking>> {
        let mut upcoming: Vec<Booking> = self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| {
                b.property_id == property_id
                    && b.status == BookingStatus::Confirmed
                    && b.check_in >= today
            })
            .cloned()
            .collect();
        upcoming.sort_by_key(|b| b.check_in);
        upcoming.truncate(limit.max(0) as usize);
        Ok(upcoming)
    }

    async fn mark_completed_before(
        &self,
        property_id: &str,
        today: NaiveDate,
    ) -> DomainResult<usize> {
        let mut bookings = self.bookings.lock().unwrap();
        let mut count = 0;
        for booking in bookings.iter_mut() {
            if booking.property_id == property_id
                && booking.status == BookingStatus::Confirmed
                && booking.check_out < today
            {
                booking.status = BookingStatus::Completed;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn status_counts(&self, property_id: &str) -> DomainResult<BookingStatistics> {
        let bookings = self.bookings.lock().unwrap();
        let mut stats = BookingStatistics::default();
        for booking in bookings.iter().filter(|b| b.property_id == property_id) {
            stats.total += 1;
            match booking.status {
                BookingStatus::Confirmed => stats.confirmed += 1,
                BookingStatus::Completed => stats.completed += 1,
                BookingStatus::Cancelled => stats.cancelled += 1,
                BookingStatus::Blocked => stats.blocked += 1,
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl ConflictRepository for InMemoryLedger {
    async fn insert(&self, conflict: &BookingConflict) -> DomainResult<()> {
        let mut conflicts = self.conflicts.lock().unwrap();
        let duplicate = conflicts.iter().any(|c| {
            !c.resolved
                && c.booking_id_1 == conflict.booking_id_1
                && c.booking_id_2 == conflict.booking_id_2
                && c.kind == conflict.kind
        });
        if duplicate {
            return Err(StaySyncError::UniqueViolation("uq_conflict_pair".into()));
        }
        conflicts.push(conflict.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<BookingConflict>> {
        Ok(self.conflicts.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn find_unresolved_pair(
        &self,
        booking_id_a: &str,
        booking_id_b: &str,
    ) -> DomainResult<Option<BookingConflict>> {
        let (id1, id2) = BookingConflict::canonical_pair(booking_id_a, booking_id_b);
        Ok(self
            .conflicts
            .lock()
            .unwrap()
            .iter()
            .find(|c| !c.resolved && c.booking_id_1 == id1 && c.booking_id_2 == id2)
            .cloned())
    }

    async fn find_unresolved_for_property(
        &self,
        property_id: &str,
    ) -> DomainResult<Vec<BookingConflict>> {
        let bookings = self.bookings.lock().unwrap();
        let conflicts = self.conflicts.lock().unwrap();
        Ok(conflicts
            .iter()
            .filter(|c| {
                !c.resolved
                    && bookings
                        .iter()
                        .any(|b| b.id == c.booking_id_1 && b.property_id == property_id)
            })
            .cloned()
            .collect())
    }

    async fn resolve(
        &self,
        conflict_id: &str,
        notes: &str,
        resolved_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut conflicts = self.conflicts.lock().unwrap();
        match conflicts.iter_mut().find(|c| c.id == conflict_id) {
            Some(conflict) => {
                conflict.resolved = true;
                conflict.resolution_notes = Some(notes.to_string());
                conflict.resolved_at = Some(resolved_at);
                Ok(())
            }
            None => Err(StaySyncError::NotFound(format!("conflict {conflict_id} not found"))),
        }
    }
}

#[async_trait]
impl SyncActionRepository for InMemoryLedger {
    async fn insert(&self, action: &SyncAction) -> DomainResult<()> {
        self.actions.lock().unwrap().push(action.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<SyncAction>> {
        Ok(self.actions.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn find_pending(&self, property_id: &str) -> DomainResult<Vec<SyncAction>> {
        let mut pending: Vec<SyncAction> = self
            .actions
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.property_id == property_id && a.status == ActionStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at))
        });
        Ok(pending)
    }

    async fn find_pending_by_conflict(
        &self,
        conflict_id: &str,
    ) -> DomainResult<Option<SyncAction>> {
        Ok(self
            .actions
            .lock()
            .unwrap()
            .iter()
            .find(|a| {
                a.status == ActionStatus::Pending && a.conflict_id.as_deref() == Some(conflict_id)
            })
            .cloned())
    }

    async fn mark_completed(
        &self,
        action_id: &str,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut actions = self.actions.lock().unwrap();
        match actions.iter_mut().find(|a| a.id == action_id) {
            Some(action) => {
                action.status = ActionStatus::Completed;
                action.completed_at = Some(at);
                action.user_notes = notes.map(String::from);
                Ok(())
            }
            None => Err(StaySyncError::NotFound(format!("action {action_id} not found"))),
        }
    }

    async fn mark_dismissed(
        &self,
        action_id: &str,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut actions = self.actions.lock().unwrap();
        match actions.iter_mut().find(|a| a.id == action_id) {
            Some(action) => {
                action.status = ActionStatus::Dismissed;
                action.dismissed_at = Some(at);
                action.user_notes = notes.map(String::from);
                Ok(())
            }
            None => Err(StaySyncError::NotFound(format!("action {action_id} not found"))),
        }
    }

    async fn expire_pending(&self, now: DateTime<Utc>) -> DomainResult<usize> {
        let mut actions = self.actions.lock().unwrap();
        let mut count = 0;
        for action in actions.iter_mut() {
            if action.should_expire(now) {
                action.status = ActionStatus::Expired;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl CalendarSourceRepository for InMemoryLedger {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<CalendarSource>> {
        Ok(self.sources.lock().unwrap().iter().find(|s| s.id == id).cloned())
    }

    async fn find_enabled(&self, property_id: &str) -> DomainResult<Vec<CalendarSource>> {
        Ok(self
            .sources
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.property_id == property_id && s.sync_enabled)
            .cloned()
            .collect())
    }

    async fn record_sync_outcome(
        &self,
        source_id: &str,
        at: DateTime<Utc>,
        status: SyncOutcome,
    ) -> DomainResult<()> {
        let mut sources = self.sources.lock().unwrap();
        match sources.iter_mut().find(|s| s.id == source_id) {
            Some(source) => {
                source.last_synced_at = Some(at);
                source.last_sync_status = Some(status);
                Ok(())
            }
            None => Err(StaySyncError::NotFound(format!("source {source_id} not found"))),
        }
    }
}

#[async_trait]
impl SyncLogRepository for InMemoryLedger {
    async fn insert(&self, log: &SyncLog) -> DomainResult<()> {
        self.logs.lock().unwrap().push(log.clone());
        Ok(())
    }

    async fn finalize(&self, log: &SyncLog) -> DomainResult<()> {
        let mut logs = self.logs.lock().unwrap();
        match logs.iter_mut().find(|l| l.id == log.id) {
            Some(slot) => {
                *slot = log.clone();
                Ok(())
            }
            None => Err(StaySyncError::NotFound(format!("sync log {} not found", log.id))),
        }
    }

    async fn history(&self, calendar_source_id: &str, limit: i64) -> DomainResult<Vec<SyncLog>> {
        let mut history: Vec<SyncLog> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.calendar_source_id == calendar_source_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        history.truncate(limit.max(0) as usize);
        Ok(history)
    }

    async fn last(&self, calendar_source_id: &str) -> DomainResult<Option<SyncLog>> {
        Ok(self.history(calendar_source_id, 1).await?.into_iter().next())
    }
}

/// Conflict repository that simulates losing the insert race exactly once:
/// before delegating the insert it sneaks a rival row for the same pair into
/// the ledger, so the delegated insert fails with a uniqueness violation.
pub struct ContendedConflictRepository {
    inner: Arc<InMemoryLedger>,
    armed: AtomicBool,
}

impl ContendedConflictRepository {
    pub fn new(inner: Arc<InMemoryLedger>) -> Self {
        Self { inner, armed: AtomicBool::new(true) }
    }
}

#[async_trait]
impl ConflictRepository for ContendedConflictRepository {
    async fn insert(&self, conflict: &BookingConflict) -> DomainResult<()> {
        if self.armed.swap(false, Ordering::SeqCst) {
            let rival = BookingConflict { id: Uuid::now_v7().to_string(), ..conflict.clone() };
            ConflictRepository::insert(self.inner.as_ref(), &rival).await?;
        }
        ConflictRepository::insert(self.inner.as_ref(), conflict).await
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<BookingConflict>> {
        ConflictRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn find_unresolved_pair(
        &self,
        booking_id_a: &str,
        booking_id_b: &str,
    ) -> DomainResult<Option<BookingConflict>> {
        self.inner.find_unresolved_pair(booking_id_a, booking_id_b).await
    }

    async fn find_unresolved_for_property(
        &self,
        property_id: &str,
    ) -> DomainResult<Vec<BookingConflict>> {
        self.inner.find_unresolved_for_property(property_id).await
    }

    async fn resolve(
        &self,
        conflict_id: &str,
        notes: &str,
        resolved_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.inner.resolve(conflict_id, notes, resolved_at).await
    }
}
