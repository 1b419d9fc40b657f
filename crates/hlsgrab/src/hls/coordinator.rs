// HLS Stream Coordinator: loads the rendition's media playlist, drives the
// segment scheduler and hands the filled job to the reassembler.

use crate::hls::config::HlsConfig;
use crate::hls::events::OnProgress;
use crate::hls::fetcher::SegmentDownloader;
use crate::hls::output::{DownloadOutcome, DownloadResult};
use crate::hls::playlist::PlaylistProvider;
use crate::hls::scheduler::{DownloadJob, SchedulerExit, SegmentScheduler};
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::HlsDownloaderError;

pub struct HlsStreamCoordinator {
    config: Arc<HlsConfig>,
    playlist_provider: Arc<dyn PlaylistProvider>,
    scheduler: SegmentScheduler,
}

impl HlsStreamCoordinator {
    pub fn new(
        config: Arc<HlsConfig>,
        playlist_provider: Arc<dyn PlaylistProvider>,
        segment_fetcher: Arc<dyn SegmentDownloader>,
    ) -> Self {
        let scheduler = SegmentScheduler::new(config.scheduler_config.clone(), segment_fetcher);
        Self {
            config,
            playlist_provider,
            scheduler,
        }
    }

    /// Headers sent with every segment request of one download.
    ///
    /// The Referer is the media playlist URL, fixed for the whole download.
    fn segment_headers(&self, playlist_url: &str) -> Result<HeaderMap, HlsDownloaderError> {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&self.config.base.user_agent).map_err(|e| {
            HlsDownloaderError::ConfigError(format!("invalid user agent: {e}"))
        })?;
        let referer = HeaderValue::from_str(playlist_url).map_err(|e| {
            HlsDownloaderError::ConfigError(format!("invalid referer {playlist_url}: {e}"))
        })?;
        headers.insert(USER_AGENT, user_agent);
        headers.insert(REFERER, referer);
        Ok(headers)
    }

    /// Download every segment of the rendition at `rendition_uri`.
    ///
    /// Playlist failures abort with an error. Segment failures never do: they
    /// are dropped from the stream and listed in the outcome.
    pub async fn run(
        &self,
        rendition_uri: &str,
        on_progress: Option<OnProgress>,
        cancel: CancellationToken,
    ) -> Result<DownloadResult, HlsDownloaderError> {
        if self.config.scheduler_config.download_concurrency == 0 {
            return Err(HlsDownloaderError::ConfigError(
                "download concurrency must be at least 1".to_string(),
            ));
        }

        let media = self
            .playlist_provider
            .load_media_playlist(rendition_uri)
            .await?;
        let headers = Arc::new(self.segment_headers(&media.url)?);

        let total = media.segments.len();
        info!(
            uri = %rendition_uri,
            segments = total,
            concurrency = self.config.scheduler_config.download_concurrency,
            "Starting segment download"
        );

        let start_time = Instant::now();
        let mut job = DownloadJob::new(rendition_uri, total, cancel);
        let exit = self
            .scheduler
            .run(&mut job, media.segments, headers, on_progress.as_ref())
            .await;

        match exit {
            SchedulerExit::Cancelled => Ok(DownloadResult::Cancelled {
                completed: job.completed(),
                total,
            }),
            SchedulerExit::Completed => {
                let outcome = DownloadOutcome::from_slots(job.slots());
                if !outcome.is_complete() {
                    warn!(
                        uri = %rendition_uri,
                        failed = outcome.failed_segments.len(),
                        total,
                        "Some segments could not be downloaded and were skipped"
                    );
                }
                info!(
                    uri = %rendition_uri,
                    size = outcome.size,
                    duration = ?start_time.elapsed(),
                    "Download complete"
                );
                Ok(DownloadResult::Completed(outcome))
            }
        }
    }
}
