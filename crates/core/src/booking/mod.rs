//! Booking ledger access and feed-event reconciliation.

pub mod ports;
pub mod service;

pub use service::{MergeOutcome, ReconciliationService};
