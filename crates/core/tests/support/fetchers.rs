//! Canned feed fetchers for orchestrator tests.

use std::collections::HashMap;

use async_trait::async_trait;
use staysync_core::feed::ports::FeedFetcher;
use staysync_domain::{Platform, Result as DomainResult, StaySyncError};

/// Serves fixed documents by URL; unknown URLs fail like an exhausted
/// retry budget would.
#[derive(Default)]
pub struct StaticFeedFetcher {
    feeds: HashMap<String, String>,
}

impl StaticFeedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: &str, document: impl Into<String>) -> Self {
        self.feeds.insert(url.to_string(), document.into());
        self
    }
}

#[async_trait]
impl FeedFetcher for StaticFeedFetcher {
    async fn fetch(&self, url: &str, _platform: Platform) -> DomainResult<String> {
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| StaySyncError::Fetch(format!("connection refused for {url}")))
    }
}
