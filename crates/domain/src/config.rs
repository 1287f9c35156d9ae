//! Engine configuration.
//!
//! One [`EngineConfig`] is constructed at process start and passed into the
//! orchestrator and adapters explicitly. It is immutable afterwards; nothing
//! in the workspace re-reads configuration from globals.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BACKOFF_BASE_SECS, DEFAULT_BACKOFF_CAP_SECS, DEFAULT_FETCH_ATTEMPTS,
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_SYNC_INTERVAL_MINUTES,
};

/// Process-wide engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path of the SQLite ledger database.
    pub database_path: PathBuf,
    /// Directory receiving timestamped audit copies of fetched feeds.
    pub download_dir: PathBuf,
    /// Per-attempt network timeout for feed downloads.
    pub fetch_timeout: Duration,
    /// Total fetch attempts per feed download (initial try + retries).
    pub fetch_attempts: u32,
    /// Exponential backoff base delay between fetch retries.
    pub backoff_base: Duration,
    /// Exponential backoff delay cap.
    pub backoff_cap: Duration,
    /// Interval between scheduled sync passes, in minutes.
    pub sync_interval_minutes: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/staysync.db"),
            download_dir: PathBuf::from("data/downloads"),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            backoff_base: Duration::from_secs(DEFAULT_BACKOFF_BASE_SECS),
            backoff_cap: Duration::from_secs(DEFAULT_BACKOFF_CAP_SECS),
            sync_interval_minutes: DEFAULT_SYNC_INTERVAL_MINUTES,
        }
    }
}
