//! Periodic calendar synchronization scheduler.
//!
//! Wraps the orchestrator in a cron job with explicit lifecycle management:
//! join handles are tracked, cancellation is explicit, and every
//! asynchronous operation is wrapped in a timeout. On-demand syncs bypass
//! the scheduler entirely and call [`SyncService::sync_all`] directly.

use std::sync::Arc;
use std::time::Duration;

use staysync_core::SyncService;
use staysync_domain::EngineConfig;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};

/// Configuration for the sync scheduler.
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Properties whose sources are synced on every tick.
    pub property_ids: Vec<String>,
    /// Timeout applied to a single scheduled sync execution.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 */30 * * * *".into(), // every 30 minutes
            property_ids: Vec::new(),
            job_timeout: Duration::from_secs(300),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl SyncSchedulerConfig {
    /// Derive the schedule from the engine configuration's sync interval.
    /// Intervals of an hour or longer need a hand-written cron expression.
    pub fn from_engine_config(config: &EngineConfig, property_ids: Vec<String>) -> Self {
        let minutes = config.sync_interval_minutes.clamp(1, 59);
        Self {
            cron_expression: format!("0 */{minutes} * * * *"),
            property_ids,
            ..Default::default()
        }
    }
}

/// Calendar synchronization scheduler with explicit lifecycle management.
pub struct SyncScheduler {
    scheduler: Option<JobScheduler>,
    config: SyncSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    service: Arc<SyncService>,
}

impl SyncScheduler {
    /// Create a scheduler with a custom configuration.
    pub fn with_config(config: SyncSchedulerConfig, service: Arc<SyncService>) -> Self {
        Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            service,
        }
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        let start_result = tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout { duration: start_timeout })?;
        start_result.map_err(SchedulerError::StartFailed)?;

        self.scheduler = Some(scheduler_instance);

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("Sync scheduler monitor cancelled");
        });
        self.monitor_handle = Some(handle);

        info!(cron = %self.config.cron_expression, "Sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let mut scheduler = match self.scheduler.take() {
            Some(scheduler) => scheduler,
            None => return Err(SchedulerError::NotRunning),
        };

        let stop_timeout = self.config.stop_timeout;
        let stop_result =
            tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
                .await
                .map_err(|_| SchedulerError::Timeout { duration: stop_timeout })?;
        stop_result.map_err(SchedulerError::StopFailed)?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { duration: join_timeout })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("Sync scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a scheduler instance is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new().await.map_err(SchedulerError::CreationFailed)?;

        let cron_expr = self.config.cron_expression.clone();
        let service = self.service.clone();
        let property_ids = self.config.property_ids.clone();
        let job_timeout = self.config.job_timeout;

        let job_definition = Job::new_async(cron_expr.as_str(), move |_id, _lock| {
            let service = service.clone();
            let property_ids = property_ids.clone();

            Box::pin(async move {
                match tokio::time::timeout(
                    job_timeout,
                    Self::perform_sync(service, property_ids),
                )
                .await
                {
                    Ok(()) => debug!("Scheduled sync tick finished"),
                    Err(_) => {
                        warn!(timeout_secs = job_timeout.as_secs(), "Scheduled sync timed out");
                    }
                }
            })
        })
        .map_err(SchedulerError::JobRegistrationFailed)?;

        let job_id = job_definition.guid();
        scheduler.add(job_definition).await.map_err(SchedulerError::JobRegistrationFailed)?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "Registered sync job");
        Ok(scheduler)
    }

    async fn perform_sync(service: Arc<SyncService>, property_ids: Vec<String>) {
        if property_ids.is_empty() {
            debug!("No properties configured for scheduled sync");
            return;
        }

        for property_id in &property_ids {
            match service.sync_all(property_id).await {
                Ok(result) if result.success => {
                    debug!(
                        property_id,
                        added = result.totals.added,
                        conflicts = result.conflicts_detected,
                        "Scheduled sync successful"
                    );
                }
                Ok(result) => {
                    warn!(
                        property_id,
                        error = result.error.as_deref().unwrap_or("one or more sources failed"),
                        "Scheduled sync completed with failures"
                    );
                }
                Err(err) => {
                    error!(property_id, error = %err, "Scheduled sync failed");
                }
            }
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SyncScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use staysync_core::feed::ports::FeedFetcher;
    use staysync_core::{ActionAdvisor, ConflictDetector, ReconciliationService};
    use staysync_domain::{Platform, Result as DomainResult, StaySyncError};
    use tempfile::TempDir;

    use crate::database::{
        DbManager, SqliteBookingRepository, SqliteCalendarSourceRepository,
        SqliteConflictRepository, SqliteSyncActionRepository, SqliteSyncLogRepository,
    };

    use super::*;

    struct UnreachableFetcher;

    #[async_trait]
    impl FeedFetcher for UnreachableFetcher {
        async fn fetch(&self, url: &str, _platform: Platform) -> DomainResult<String> {
            Err(StaySyncError::Fetch(format!("no route to {url}")))
        }
    }

    fn test_service(temp: &TempDir) -> Arc<SyncService> {
        let manager = DbManager::new(temp.path().join("test.db"), 2).expect("manager");
        manager.run_migrations().expect("migrations");
        let pool = manager.pool();

        let bookings = Arc::new(SqliteBookingRepository::new(pool.clone()));
        Arc::new(SyncService::new(
            Arc::new(UnreachableFetcher),
            ReconciliationService::new(bookings.clone()),
            ConflictDetector::new(
                bookings.clone(),
                Arc::new(SqliteConflictRepository::new(pool.clone())),
            ),
            ActionAdvisor::new(bookings, Arc::new(SqliteSyncActionRepository::new(pool.clone()))),
            Arc::new(SqliteCalendarSourceRepository::new(pool.clone())),
            Arc::new(SqliteSyncLogRepository::new(pool)),
        ))
    }

    fn fast_config() -> SyncSchedulerConfig {
        SyncSchedulerConfig {
            cron_expression: "0 */30 * * * *".into(),
            property_ids: vec!["prop-1".into()],
            ..Default::default()
        }
    }

    #[test]
    fn interval_translates_to_a_cron_expression() {
        let engine = EngineConfig { sync_interval_minutes: 15, ..EngineConfig::default() };
        let config = SyncSchedulerConfig::from_engine_config(&engine, vec!["prop-1".into()]);
        assert_eq!(config.cron_expression, "0 */15 * * * *");

        let zero = EngineConfig { sync_interval_minutes: 0, ..EngineConfig::default() };
        let clamped = SyncSchedulerConfig::from_engine_config(&zero, Vec::new());
        assert_eq!(clamped.cron_expression, "0 */1 * * * *");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_runs_successfully() {
        let temp = TempDir::new().expect("temp dir");
        let mut scheduler = SyncScheduler::with_config(fast_config(), test_service(&temp));

        scheduler.start().await.expect("start succeeds");
        assert!(scheduler.is_running());
        scheduler.stop().await.expect("stop succeeds");
        assert!(!scheduler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_is_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let mut scheduler = SyncScheduler::with_config(fast_config(), test_service(&temp));

        scheduler.start().await.expect("first start");
        let err = scheduler.start().await.expect_err("second start fails");
        assert!(matches!(err, SchedulerError::AlreadyRunning));
        scheduler.stop().await.expect("stop succeeds");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restart_after_stop_succeeds() {
        let temp = TempDir::new().expect("temp dir");
        let mut scheduler = SyncScheduler::with_config(fast_config(), test_service(&temp));

        scheduler.start().await.expect("start succeeds");
        scheduler.stop().await.expect("stop succeeds");
        assert!(!scheduler.is_running());

        scheduler.start().await.expect("start again");
        scheduler.stop().await.expect("stop again");
    }

    #[tokio::test]
    async fn stop_without_start_is_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let mut scheduler = SyncScheduler::with_config(fast_config(), test_service(&temp));
        let err = scheduler.stop().await.expect_err("stop fails");
        assert!(matches!(err, SchedulerError::NotRunning));
    }
}
