// HLS Segment Fetcher: downloads individual media segments with bounded retry.

use crate::hls::config::HlsConfig;
use crate::hls::playlist::SegmentRef;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Outcome of fetching one segment. A segment is either complete or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentResult {
    Bytes(Bytes),
    /// Every attempt failed
    Failed,
}

impl SegmentResult {
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            SegmentResult::Bytes(bytes) => Some(bytes),
            SegmentResult::Failed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SegmentResult::Failed)
    }
}

#[async_trait]
pub trait SegmentDownloader: Send + Sync {
    /// Fetch one segment. Failure is reported as [`SegmentResult::Failed`], never as an error.
    async fn download_segment(&self, segment: &SegmentRef, headers: &HeaderMap) -> SegmentResult;
}

#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(StatusCode),
}

pub struct SegmentFetcher {
    http_client: Client,
    config: Arc<HlsConfig>,
}

impl SegmentFetcher {
    pub fn new(http_client: Client, config: Arc<HlsConfig>) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Fetch `uri`, making at most `max_retries` attempts in total.
    ///
    /// Any network error, body read error or non-2xx status fails the attempt.
    /// A `max_retries` of zero still makes one attempt.
    pub async fn fetch(&self, uri: &Url, headers: &HeaderMap, max_retries: u32) -> SegmentResult {
        let attempts = max_retries.max(1);
        let backoff = self.config.fetcher_config.retry_backoff;

        for attempt in 1..=attempts {
            match self.try_fetch(uri, headers).await {
                Ok(bytes) => {
                    debug!(uri = %uri, attempt, size = bytes.len(), "Downloaded segment");
                    return SegmentResult::Bytes(bytes);
                }
                Err(e) => {
                    debug!(uri = %uri, attempt, error = %e, "Segment attempt failed");
                    if attempt < attempts {
                        let delay = backoff.delay_after(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        warn!(uri = %uri, attempts, "Giving up on segment");
        SegmentResult::Failed
    }

    async fn try_fetch(&self, uri: &Url, headers: &HeaderMap) -> Result<Bytes, AttemptError> {
        let response = self
            .http_client
            .get(uri.clone())
            .headers(headers.clone())
            .timeout(self.config.fetcher_config.segment_download_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status));
        }

        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl SegmentDownloader for SegmentFetcher {
    async fn download_segment(&self, segment: &SegmentRef, headers: &HeaderMap) -> SegmentResult {
        self.fetch(
            &segment.uri,
            headers,
            self.config.fetcher_config.max_segment_retries,
        )
        .await
    }
}
