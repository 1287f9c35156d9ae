//! The sync orchestrator.
//!
//! Drives one full synchronization pass per calendar source and aggregates
//! the results. A pass walks a fixed sequence of stages — fetched, parsed,
//! reconciled, conflicts-checked — and finalizes its [`SyncLog`] exactly
//! once, whether it completes or fails. One source's failure never aborts
//! the others.

use std::sync::Arc;

use chrono::Utc;
use staysync_domain::{CalendarSource, Platform, Result, SyncLog, SyncOutcome};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::action::ActionAdvisor;
use crate::booking::{MergeOutcome, ReconciliationService};
use crate::conflict::ConflictDetector;
use crate::feed::parser::parse_feed;
use crate::feed::ports::FeedFetcher;

use super::ports::{CalendarSourceRepository, SyncLogRepository};

/// Ledger mutation counts accumulated over one or more passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSyncStats {
    pub added: i64,
    pub updated: i64,
    pub cancelled: i64,
    pub unchanged: i64,
}

impl SourceSyncStats {
    fn absorb(&mut self, other: &SourceSyncStats) {
        self.added += other.added;
        self.updated += other.updated;
        self.cancelled += other.cancelled;
        self.unchanged += other.unchanged;
    }

    fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Created => self.added += 1,
            MergeOutcome::Updated => self.updated += 1,
            MergeOutcome::Cancelled => self.cancelled += 1,
            MergeOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// Outcome of one pass over one calendar source.
#[derive(Debug, Clone)]
pub struct SourceSyncResult {
    pub calendar_source_id: String,
    pub platform: Platform,
    pub success: bool,
    pub stats: SourceSyncStats,
    pub conflicts_detected: usize,
    pub error: Option<String>,
    pub sync_log_id: String,
    pub duration_ms: i64,
}

/// Aggregate outcome of syncing every enabled source of a property.
#[derive(Debug, Clone, Default)]
pub struct FullSyncResult {
    pub success: bool,
    pub totals: SourceSyncStats,
    pub completed_bookings: usize,
    pub conflicts_detected: usize,
    pub auto_resolved: usize,
    pub actions_created: usize,
    pub actions_expired: usize,
    pub error: Option<String>,
    pub sources: Vec<SourceSyncResult>,
}

/// Composes fetcher, parser, reconciler, detector, and advisor into full
/// synchronization passes.
pub struct SyncService {
    fetcher: Arc<dyn FeedFetcher>,
    reconciler: ReconciliationService,
    detector: ConflictDetector,
    advisor: ActionAdvisor,
    sources: Arc<dyn CalendarSourceRepository>,
    logs: Arc<dyn SyncLogRepository>,
}

impl SyncService {
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        reconciler: ReconciliationService,
        detector: ConflictDetector,
        advisor: ActionAdvisor,
        sources: Arc<dyn CalendarSourceRepository>,
        logs: Arc<dyn SyncLogRepository>,
    ) -> Self {
        Self { fetcher, reconciler, detector, advisor, sources, logs }
    }

    /// Run one pass over a single calendar source.
    ///
    /// Any failure is captured into the pass's [`SyncLog`] and the returned
    /// result; it is never propagated so that sibling sources still sync.
    pub async fn sync_source(&self, source: &CalendarSource) -> Result<SourceSyncResult> {
        info!(
            source_id = %source.id,
            platform = %source.platform,
            "starting sync pass"
        );

        let started_at = Utc::now();
        let mut log = SyncLog {
            id: Uuid::now_v7().to_string(),
            calendar_source_id: source.id.clone(),
            status: SyncOutcome::Success,
            bookings_added: 0,
            bookings_updated: 0,
            bookings_cancelled: 0,
            conflicts_detected: 0,
            error_message: None,
            duration_ms: None,
            started_at,
            completed_at: None,
        };
        self.logs.insert(&log).await?;

        let pass = self.run_pass(source).await;
        let completed_at = Utc::now();
        let duration_ms = (completed_at - started_at).num_milliseconds();
        log.completed_at = Some(completed_at);
        log.duration_ms = Some(duration_ms);

        match pass {
            Ok((stats, conflicts_detected)) => {
                log.status = SyncOutcome::Success;
                log.bookings_added = stats.added;
                log.bookings_updated = stats.updated;
                log.bookings_cancelled = stats.cancelled;
                log.conflicts_detected = conflicts_detected as i64;
                self.logs.finalize(&log).await?;
                self.sources
                    .record_sync_outcome(&source.id, completed_at, SyncOutcome::Success)
                    .await?;

                info!(
                    source_id = %source.id,
                    added = stats.added,
                    updated = stats.updated,
                    cancelled = stats.cancelled,
                    unchanged = stats.unchanged,
                    conflicts = conflicts_detected,
                    duration_ms,
                    "sync pass completed"
                );

                Ok(SourceSyncResult {
                    calendar_source_id: source.id.clone(),
                    platform: source.platform,
                    success: true,
                    stats,
                    conflicts_detected,
                    error: None,
                    sync_log_id: log.id,
                    duration_ms,
                })
            }
            Err(err) => {
                let message = err.to_string();
                error!(source_id = %source.id, error = %message, "sync pass failed");

                log.status = SyncOutcome::Error;
                log.error_message = Some(message.clone());
                self.logs.finalize(&log).await?;
                self.sources
                    .record_sync_outcome(&source.id, completed_at, SyncOutcome::Error)
                    .await?;

                Ok(SourceSyncResult {
                    calendar_source_id: source.id.clone(),
                    platform: source.platform,
                    success: false,
                    stats: SourceSyncStats::default(),
                    conflicts_detected: 0,
                    error: Some(message),
                    sync_log_id: log.id,
                    duration_ms,
                })
            }
        }
    }

    /// Sync every enabled source of a property, then run the maintenance,
    /// detection, auto-resolution, and advisory passes over the whole
    /// ledger.
    pub async fn sync_all(&self, property_id: &str) -> Result<FullSyncResult> {
        let sources = self.sources.find_enabled(property_id).await?;

        if sources.is_empty() {
            warn!(property_id, "no enabled calendar sources to sync");
            return Ok(FullSyncResult {
                success: false,
                error: Some("no enabled calendar sources".into()),
                ..Default::default()
            });
        }

        let mut result = FullSyncResult { success: true, ..Default::default() };
        for source in &sources {
            let source_result = self.sync_source(source).await?;
            result.success &= source_result.success;
            result.totals.absorb(&source_result.stats);
            result.sources.push(source_result);
        }

        let today = Utc::now().date_naive();
        result.completed_bookings = self.reconciler.mark_completed(property_id, today).await?;

        // Resolve conflicts already moot (a participant got cancelled) before
        // the batch detection, so the advisor only sees live conflicts.
        result.auto_resolved = self.detector.auto_resolve_cancelled(property_id).await?;
        let conflicts = self.detector.detect_all(property_id, today).await?;
        result.conflicts_detected = conflicts.len();
        result.actions_created = self.advisor.advise(&conflicts, property_id).await?.len();
        result.actions_expired = self.advisor.expire_pending().await?;

        info!(
            property_id,
            success = result.success,
            added = result.totals.added,
            updated = result.totals.updated,
            cancelled = result.totals.cancelled,
            conflicts = result.conflicts_detected,
            auto_resolved = result.auto_resolved,
            actions = result.actions_created,
            "full sync completed"
        );

        Ok(result)
    }

    /// Sync history for a source, newest first.
    pub async fn history(&self, calendar_source_id: &str, limit: i64) -> Result<Vec<SyncLog>> {
        self.logs.history(calendar_source_id, limit).await
    }

    /// The most recent sync log for a source.
    pub async fn last_log(&self, calendar_source_id: &str) -> Result<Option<SyncLog>> {
        self.logs.last(calendar_source_id).await
    }

    /// The fetch→parse→reconcile→detect stages of one pass. Errors bubble
    /// to [`Self::sync_source`], which records them on the log.
    async fn run_pass(&self, source: &CalendarSource) -> Result<(SourceSyncStats, usize)> {
        let content = self.fetcher.fetch(&source.feed_url, source.platform).await?;
        debug!(source_id = %source.id, bytes = content.len(), stage = "fetched");

        let events = parse_feed(&content, source.platform)?;
        debug!(source_id = %source.id, events = events.len(), stage = "parsed");

        let mut stats = SourceSyncStats::default();
        for event in &events {
            let (_, outcome) =
                self.reconciler.merge_event(event, &source.id, &source.property_id).await?;
            stats.record(outcome);
        }
        debug!(source_id = %source.id, stage = "reconciled");

        let today = Utc::now().date_naive();
        let conflicts = self.detector.detect_all(&source.property_id, today).await?;
        debug!(source_id = %source.id, conflicts = conflicts.len(), stage = "conflicts-checked");

        Ok((stats, conflicts.len()))
    }
}
