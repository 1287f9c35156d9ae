//! Port interface for downloading calendar feeds.

use async_trait::async_trait;
use staysync_domain::{Platform, Result};

/// Trait for downloading a calendar feed document.
///
/// Implementations own retries, timeouts, and audit copies; callers only
/// see the final document text or a
/// [`staysync_domain::StaySyncError::Fetch`] once the retry budget is
/// exhausted.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Download the raw feed document at `url`.
    async fn fetch(&self, url: &str, platform: Platform) -> Result<String>;
}
