//! Domain error types shared across the workspace.

use thiserror::Error;

/// Top-level error type for all StaySync operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StaySyncError {
    #[error("Database error: {0}")]
    Database(String),

    /// A row insert hit a uniqueness constraint. Kept separate from
    /// [`StaySyncError::Database`] so conflict-detection writers can recover
    /// from the expected duplicate-insert race without string matching.
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    /// A feed download failed after exhausting its retry budget.
    #[error("Feed fetch error: {0}")]
    Fetch(String),

    /// A feed document could not be parsed at all.
    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for StaySync operations
pub type Result<T> = std::result::Result<T, StaySyncError>;
