use reqwest::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{DownloadError, create_client};

use super::events::OnProgress;
use super::fetcher::SegmentFetcher;
use super::output::DownloadResult;
use super::playlist::{PlaylistEngine, PlaylistProvider, RenditionSet};
use super::{HlsConfig, HlsDownloaderError, HlsStreamCoordinator};

/// Entry point for callers: resolve renditions, then download one of them.
pub struct HlsDownloader {
    client: Client,
    config: Arc<HlsConfig>,
    playlist_engine: Arc<PlaylistEngine>,
    coordinator: HlsStreamCoordinator,
}

impl HlsDownloader {
    pub fn new(config: HlsConfig) -> Result<Self, DownloadError> {
        let client = create_client(&config.base)?;
        Ok(Self::with_client(config, client))
    }

    /// Create a downloader that shares an existing HTTP client
    pub fn with_client(config: HlsConfig, client: Client) -> Self {
        let config = Arc::new(config);
        let playlist_engine = Arc::new(PlaylistEngine::new(client.clone(), Arc::clone(&config)));
        let segment_fetcher = Arc::new(SegmentFetcher::new(client.clone(), Arc::clone(&config)));
        let coordinator = HlsStreamCoordinator::new(
            Arc::clone(&config),
            playlist_engine.clone(),
            segment_fetcher,
        );
        Self {
            client,
            config,
            playlist_engine,
            coordinator,
        }
    }

    pub fn config(&self) -> &HlsConfig {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// List the renditions offered at `url`, keyed by resolution label.
    pub async fn resolve_renditions(&self, url: &str) -> Result<RenditionSet, HlsDownloaderError> {
        self.playlist_engine.resolve_renditions(url).await
    }

    /// Download and reassemble the rendition whose media playlist is at `rendition_uri`.
    ///
    /// `cancel` is polled between segment completions.
    pub async fn start_download(
        &self,
        rendition_uri: &str,
        on_progress: Option<OnProgress>,
        cancel: CancellationToken,
    ) -> Result<DownloadResult, HlsDownloaderError> {
        self.coordinator.run(rendition_uri, on_progress, cancel).await
    }
}
