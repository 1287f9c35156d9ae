//! Pairwise conflict detection between bookings.
//!
//! Scans a property's active bookings for overlapping stays, classifies
//! suspected cross-platform duplicates, and persists conflict records while
//! tolerating the duplicate-insert race between concurrent sync passes.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use staysync_domain::utils::dates;
use staysync_domain::{
    Booking, BookingConflict, BookingStatus, ConflictKind, ConflictSeverity, Result, StaySyncError,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::booking::ports::BookingRepository;

use super::ports::ConflictRepository;

/// Severity and kind counts over a property's unresolved conflicts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub duplicates: usize,
    pub overlaps: usize,
}

/// Detects overlap and duplicate conflicts between bookings.
pub struct ConflictDetector {
    bookings: Arc<dyn BookingRepository>,
    conflicts: Arc<dyn ConflictRepository>,
}

impl ConflictDetector {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        conflicts: Arc<dyn ConflictRepository>,
    ) -> Self {
        Self { bookings, conflicts }
    }

    /// Detect all currently-relevant conflicts for a property.
    ///
    /// Returns existing unresolved conflicts as-is and persists any newly
    /// discovered ones. Quadratic in the active-booking count, which stays
    /// small for a single property.
    pub async fn detect_all(
        &self,
        property_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<BookingConflict>> {
        let bookings = self.bookings.find_active(property_id, today).await?;

        if bookings.len() < 2 {
            debug!(property_id, "fewer than two active bookings, no conflicts possible");
            return Ok(Vec::new());
        }

        let mut conflicts = Vec::new();
        for i in 0..bookings.len() {
            for j in (i + 1)..bookings.len() {
                if let Some(conflict) = self.check_known_or_new(&bookings[i], &bookings[j]).await? {
                    conflicts.push(conflict);
                }
            }
        }

        info!(property_id, count = conflicts.len(), "conflict detection pass finished");
        Ok(conflicts)
    }

    /// Incremental check: conflicts implicated by a single booking, for use
    /// right after a create or update.
    pub async fn check_booking(&self, booking: &Booking) -> Result<Vec<BookingConflict>> {
        let others = self
            .bookings
            .find_overlapping(
                &booking.property_id,
                booking.check_in,
                booking.check_out,
                Some(&booking.id),
            )
            .await?;

        let mut conflicts = Vec::new();
        for other in &others {
            if let Some(conflict) = self.check_known_or_new(booking, other).await? {
                conflicts.push(conflict);
            }
        }
        Ok(conflicts)
    }

    /// Resolve unresolved conflicts whose participants have since been
    /// cancelled, noting the cancelling booking id. Returns the number of
    /// conflicts resolved.
    pub async fn auto_resolve_cancelled(&self, property_id: &str) -> Result<usize> {
        let conflicts = self.conflicts.find_unresolved_for_property(property_id).await?;
        let mut resolved = 0;

        for conflict in conflicts {
            let first = self.bookings.find_by_id(&conflict.booking_id_1).await?;
            let second = self.bookings.find_by_id(&conflict.booking_id_2).await?;

            let cancelled = [first, second]
                .into_iter()
                .flatten()
                .find(|booking| booking.status == BookingStatus::Cancelled);

            if let Some(booking) = cancelled {
                let notes = format!("Auto-resolved: booking {} was cancelled", booking.id);
                self.conflicts.resolve(&conflict.id, &notes, Utc::now()).await?;
                resolved += 1;
            }
        }

        if resolved > 0 {
            info!(property_id, resolved, "auto-resolved conflicts with cancelled bookings");
        }
        Ok(resolved)
    }

    /// Operator resolution with free-form notes.
    pub async fn resolve(&self, conflict_id: &str, notes: &str) -> Result<BookingConflict> {
        if self.conflicts.find_by_id(conflict_id).await?.is_none() {
            return Err(StaySyncError::NotFound(format!("conflict {conflict_id} not found")));
        }
        self.conflicts.resolve(conflict_id, notes, Utc::now()).await?;
        self.conflicts.find_by_id(conflict_id).await?.ok_or_else(|| {
            StaySyncError::Internal(format!("conflict {conflict_id} vanished during resolution"))
        })
    }

    /// Severity/kind counts over a property's unresolved conflicts.
    pub async fn summary(&self, property_id: &str) -> Result<ConflictSummary> {
        let conflicts = self.conflicts.find_unresolved_for_property(property_id).await?;

        let mut summary = ConflictSummary { total: conflicts.len(), ..Default::default() };
        for conflict in &conflicts {
            match conflict.severity() {
                ConflictSeverity::Critical => summary.critical += 1,
                ConflictSeverity::High => summary.high += 1,
                ConflictSeverity::Medium => summary.medium += 1,
                ConflictSeverity::Low => summary.low += 1,
            }
            match conflict.kind {
                ConflictKind::Duplicate => summary.duplicates += 1,
                ConflictKind::Overlap => summary.overlaps += 1,
            }
        }
        Ok(summary)
    }

    /// Reuse the unresolved conflict already recorded for the pair, or test
    /// the pair and persist a new record.
    async fn check_known_or_new(
        &self,
        a: &Booking,
        b: &Booking,
    ) -> Result<Option<BookingConflict>> {
        if let Some(existing) = self.conflicts.find_unresolved_pair(&a.id, &b.id).await? {
            return Ok(Some(existing));
        }
        self.check_pair(a, b).await
    }

    async fn check_pair(&self, a: &Booking, b: &Booking) -> Result<Option<BookingConflict>> {
        if !a.overlaps(b.check_in, b.check_out) {
            return Ok(None);
        }

        let Some((overlap_start, overlap_end)) =
            dates::overlap_period(a.check_in, a.check_out, b.check_in, b.check_out)
        else {
            return Ok(None);
        };

        let kind = if Self::is_duplicate(a, b) {
            warn!(booking_1 = %a.id, booking_2 = %b.id, "duplicate booking detected");
            ConflictKind::Duplicate
        } else {
            warn!(booking_1 = %a.id, booking_2 = %b.id, "booking overlap detected");
            ConflictKind::Overlap
        };

        let (booking_id_1, booking_id_2) = BookingConflict::canonical_pair(&a.id, &b.id);
        let conflict = BookingConflict {
            id: Uuid::now_v7().to_string(),
            booking_id_1,
            booking_id_2,
            kind,
            overlap_start: Some(overlap_start),
            overlap_end: Some(overlap_end),
            resolved: false,
            resolution_notes: None,
            detected_at: Utc::now(),
            resolved_at: None,
        };

        match self.conflicts.insert(&conflict).await {
            Ok(()) => {
                info!(
                    conflict_id = %conflict.id,
                    kind = %conflict.kind,
                    severity = %conflict.severity(),
                    "conflict registered"
                );
                Ok(Some(conflict))
            }
            // Expected race: another sync pass registered the same pair
            // between our existence check and the insert. Adopt its row.
            Err(StaySyncError::UniqueViolation(_)) => {
                match self.conflicts.find_unresolved_pair(&a.id, &b.id).await? {
                    Some(existing) => {
                        debug!(conflict_id = %existing.id, "conflict already exists, adopting");
                        Ok(Some(existing))
                    }
                    None => Err(StaySyncError::Internal(format!(
                        "conflict insert for pair ({}, {}) hit a uniqueness violation but no \
                         unresolved conflict exists",
                        a.id, b.id
                    ))),
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Duplicate heuristic: different platforms, both stay boundaries within
    /// one day of each other, and similar guest names. Deliberately biased
    /// towards false positives; missed duplicates cost far more than a
    /// manual double-check.
    fn is_duplicate(a: &Booking, b: &Booking) -> bool {
        if a.platform == b.platform {
            return false;
        }

        let check_in_diff = (a.check_in - b.check_in).num_days().abs();
        let check_out_diff = (a.check_out - b.check_out).num_days().abs();
        if check_in_diff > 1 || check_out_diff > 1 {
            return false;
        }

        Self::names_similar(&a.guest_name, &b.guest_name)
    }

    /// Exact match, shared first or family-name token, or containment,
    /// case-insensitive. The family-name rule is what lets an abbreviated
    /// "J. Smith" match "John Smith" across platforms.
    fn names_similar(a: &str, b: &str) -> bool {
        let name_a = a.trim().to_lowercase();
        let name_b = b.trim().to_lowercase();

        if name_a == name_b {
            return true;
        }

        let first_a = name_a.split_whitespace().next();
        let first_b = name_b.split_whitespace().next();
        if let (Some(first_a), Some(first_b)) = (first_a, first_b) {
            if first_a == first_b {
                return true;
            }
        }

        let last_a = name_a.split_whitespace().last();
        let last_b = name_b.split_whitespace().last();
        if let (Some(last_a), Some(last_b)) = (last_a, last_b) {
            if last_a == last_b {
                return true;
            }
        }

        name_a.contains(&name_b) || name_b.contains(&name_a)
    }
}
