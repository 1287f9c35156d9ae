//! Sync orchestration: one fetch→parse→reconcile→detect pass per source.

pub mod ports;
pub mod service;

pub use service::{FullSyncResult, SourceSyncResult, SourceSyncStats, SyncService};
