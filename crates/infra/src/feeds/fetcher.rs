//! iCal feed fetcher implementing the core [`FeedFetcher`] port.
//!
//! Downloads go through the retrying [`HttpClient`]; every successful
//! response is also copied, best-effort, into a timestamped audit file so
//! malformed feeds can be inspected after the fact.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use staysync_core::feed::ports::FeedFetcher;
use staysync_domain::{EngineConfig, Platform, Result, StaySyncError};
use tracing::{debug, info, instrument, warn};

use crate::http::HttpClient;

/// HTTP implementation of the [`FeedFetcher`] port.
pub struct IcalFeedFetcher {
    client: HttpClient,
    download_dir: PathBuf,
}

impl IcalFeedFetcher {
    /// Build a fetcher from the engine configuration.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(config.fetch_timeout)
            .max_attempts(config.fetch_attempts as usize)
            .base_backoff(config.backoff_base)
            .max_backoff(config.backoff_cap)
            .build()?;

        Ok(Self { client, download_dir: config.download_dir.clone() })
    }

    /// Persist a timestamped copy of the raw response for debugging. This
    /// must never fail the fetch itself.
    fn audit_copy(&self, platform: Platform, content: &str) {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = self.download_dir.join(format!("{platform}_{timestamp}.ics"));

        let written = std::fs::create_dir_all(&self.download_dir)
            .and_then(|()| std::fs::write(&path, content));
        match written {
            Ok(()) => debug!(path = %path.display(), "saved feed audit copy"),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to save feed audit copy");
            }
        }
    }
}

#[async_trait]
impl FeedFetcher for IcalFeedFetcher {
    #[instrument(skip(self), fields(platform = %platform))]
    async fn fetch(&self, url: &str, platform: Platform) -> Result<String> {
        info!(platform = %platform, "downloading calendar feed");

        let response =
            self.client.send(self.client.request(Method::GET, url)).await.map_err(|err| {
                match err {
                    // Malformed URLs and other request-construction problems
                    // fail fast; everything else already exhausted its
                    // retries inside the client.
                    StaySyncError::InvalidInput(msg) => StaySyncError::InvalidInput(msg),
                    other => StaySyncError::Fetch(other.to_string()),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StaySyncError::Fetch(format!("feed request returned HTTP {status}")));
        }

        let content = response
            .text()
            .await
            .map_err(|err| StaySyncError::Fetch(format!("failed to read feed body: {err}")))?;

        info!(platform = %platform, bytes = content.len(), "feed downloaded");
        self.audit_copy(platform, &content);

        Ok(content)
    }
}
