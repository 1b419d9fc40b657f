//! # Protocol Builder
//!
//! Fluent builder for creating an [`HlsDownloader`] with a specific configuration.

use crate::{
    DownloadError, DownloaderConfig,
    hls::{CancelPolicy, HlsConfig, HlsDownloader, RetryBackoff},
    proxy::ProxyConfig,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::{str::FromStr, time::Duration};
use tracing::warn;

/// Builder for HLS downloaders
pub struct HlsProtocolBuilder {
    config: HlsConfig,
}

impl HlsProtocolBuilder {
    /// Create a new HLS protocol builder with default configuration
    pub fn new() -> Self {
        Self {
            config: HlsConfig::default(),
        }
    }

    pub fn with_base_config(mut self, base_config: DownloaderConfig) -> Self {
        self.config.base = base_config;
        self
    }

    // --- Base DownloaderConfig methods ---

    /// Set user agent for HTTP requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.base.user_agent = user_agent.into();
        self
    }

    /// Set connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.base.connect_timeout = timeout;
        self
    }

    /// Set whether to follow HTTP redirects
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.base.follow_redirects = follow;
        self
    }

    /// Set HTTP headers
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.config.base.headers = headers;
        self
    }

    /// Add a single HTTP header. Invalid names or values are skipped.
    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.config.base.headers.insert(name, value);
            }
            _ => warn!(name, "Skipping invalid header"),
        }
        self
    }

    /// Set proxy configuration
    pub fn proxy(mut self, proxy_config: ProxyConfig) -> Self {
        self.config.base.proxy = Some(proxy_config);
        self.config.base.use_system_proxy = false;
        self
    }

    /// Set whether to use system proxy settings
    pub fn use_system_proxy(mut self, use_system_proxy: bool) -> Self {
        self.config.base.use_system_proxy = use_system_proxy;
        self
    }

    // --- HLS PlaylistConfig methods ---

    /// Set timeout for fetching master and media playlists.
    pub fn playlist_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.playlist_config.fetch_timeout = timeout;
        self
    }

    // --- HLS SchedulerConfig methods ---

    /// Set maximum concurrent segment downloads.
    pub fn download_concurrency(mut self, concurrency: usize) -> Self {
        self.config.scheduler_config.download_concurrency = concurrency;
        self
    }

    pub fn cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.config.scheduler_config.cancel_policy = policy;
        self
    }

    // --- HLS FetcherConfig methods ---

    /// Set timeout for a single segment attempt.
    pub fn segment_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetcher_config.segment_download_timeout = timeout;
        self
    }

    /// Set the total number of attempts per segment.
    pub fn segment_retry_count(mut self, retries: u32) -> Self {
        self.config.fetcher_config.max_segment_retries = retries;
        self
    }

    pub fn retry_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.config.fetcher_config.retry_backoff = backoff;
        self
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &HlsConfig {
        &self.config
    }

    pub fn build(self) -> Result<HlsDownloader, DownloadError> {
        HlsDownloader::new(self.config)
    }
}

impl Default for HlsProtocolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
