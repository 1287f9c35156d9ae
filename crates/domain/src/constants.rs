//! Domain constants shared by the engine and its adapters.

/// Default interval between scheduled sync passes, in minutes.
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u32 = 30;

/// Total fetch attempts per feed download (initial try + retries).
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Per-attempt network timeout for feed downloads, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Exponential backoff base delay between fetch retries, in seconds.
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 2;

/// Exponential backoff delay cap, in seconds.
pub const DEFAULT_BACKOFF_CAP_SECS: u64 = 10;

/// Pending block-dates actions expire after this many hours.
pub const BLOCK_ACTION_EXPIRY_HOURS: i64 = 72;

/// Pending cancel-booking actions expire after this many hours.
pub const CANCEL_ACTION_EXPIRY_HOURS: i64 = 24;

/// Guest name used when no heuristic produces a usable name.
pub const FALLBACK_GUEST_NAME: &str = "Guest";

/// Currency assumed for bookings whose feed carries no price information.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Summary/description keywords that force an event into `blocked` status
/// regardless of what the feed's own status field claims.
pub const BLOCK_KEYWORDS: &[&str] = &["blocked", "bloqueado", "not available", "unavailable"];
