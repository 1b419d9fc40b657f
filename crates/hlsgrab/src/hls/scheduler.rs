// HLS Segment Scheduler: runs segment fetches over a bounded pool and records
// their results into the download job.

use crate::hls::config::{CancelPolicy, HlsSchedulerConfig};
use crate::hls::events::{DownloadProgress, OnProgress};
use crate::hls::fetcher::{SegmentDownloader, SegmentResult};
use crate::hls::playlist::SegmentRef;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Mutable state of one download, owned by the coordinating task.
#[derive(Debug)]
pub struct DownloadJob {
    rendition_uri: String,
    slots: Vec<Option<SegmentResult>>,
    completed: usize,
    failed: usize,
    bytes_downloaded: u64,
    cancel: CancellationToken,
}

impl DownloadJob {
    pub fn new(rendition_uri: impl Into<String>, total: usize, cancel: CancellationToken) -> Self {
        Self {
            rendition_uri: rendition_uri.into(),
            slots: vec![None; total],
            completed: 0,
            failed: 0,
            bytes_downloaded: 0,
            cancel,
        }
    }

    pub fn rendition_uri(&self) -> &str {
        &self.rendition_uri
    }

    pub fn total(&self) -> usize {
        self.slots.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Store `result` at `index`. Each index is recorded at most once.
    pub fn record(&mut self, index: usize, result: SegmentResult) {
        let Some(slot) = self.slots.get_mut(index) else {
            debug!(index, "Ignoring result for unknown segment index");
            return;
        };
        if slot.is_some() {
            debug!(index, "Ignoring duplicate result for segment");
            return;
        }

        match &result {
            SegmentResult::Bytes(bytes) => self.bytes_downloaded += bytes.len() as u64,
            SegmentResult::Failed => self.failed += 1,
        }
        *slot = Some(result);
        self.completed += 1;
    }

    pub fn progress(&self) -> DownloadProgress {
        DownloadProgress {
            completed: self.completed,
            total: self.total(),
            failed: self.failed,
            bytes_downloaded: self.bytes_downloaded,
        }
    }

    pub fn slots(&self) -> &[Option<SegmentResult>] {
        &self.slots
    }
}

/// How the scheduler stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerExit {
    Completed,
    Cancelled,
}

pub struct SegmentScheduler {
    config: HlsSchedulerConfig,
    segment_fetcher: Arc<dyn SegmentDownloader>,
}

impl SegmentScheduler {
    pub fn new(config: HlsSchedulerConfig, segment_fetcher: Arc<dyn SegmentDownloader>) -> Self {
        Self {
            config,
            segment_fetcher,
        }
    }

    async fn perform_segment_download(
        segment_fetcher: Arc<dyn SegmentDownloader>,
        segment: SegmentRef,
        headers: Arc<HeaderMap>,
    ) -> (usize, SegmentResult) {
        let result = segment_fetcher.download_segment(&segment, &headers).await;
        (segment.index, result)
    }

    /// Fetch `segments` into `job`, keeping at most `download_concurrency` in flight.
    ///
    /// Cancellation is polled once per completion, before the result is recorded.
    pub async fn run(
        &self,
        job: &mut DownloadJob,
        segments: Vec<SegmentRef>,
        headers: Arc<HeaderMap>,
        on_progress: Option<&OnProgress>,
    ) -> SchedulerExit {
        let concurrency = self.config.download_concurrency.max(1);
        let mut pending = segments.into_iter();
        // Completion order is arbitrary, the job's slots restore playlist order
        let mut in_flight = FuturesUnordered::new();

        for segment in pending.by_ref().take(concurrency) {
            in_flight.push(Self::perform_segment_download(
                Arc::clone(&self.segment_fetcher),
                segment,
                Arc::clone(&headers),
            ));
        }

        while let Some((index, result)) = in_flight.next().await {
            if job.is_cancelled() {
                info!(
                    uri = %job.rendition_uri(),
                    completed = job.completed(),
                    total = job.total(),
                    in_flight = in_flight.len(),
                    "Cancellation requested, stopping download"
                );
                if self.config.cancel_policy == CancelPolicy::Drain {
                    while in_flight.next().await.is_some() {}
                }
                return SchedulerExit::Cancelled;
            }

            if let Some(segment) = pending.next() {
                in_flight.push(Self::perform_segment_download(
                    Arc::clone(&self.segment_fetcher),
                    segment,
                    Arc::clone(&headers),
                ));
            }

            job.record(index, result);
            if let Some(on_progress) = on_progress {
                on_progress(job.progress());
            }
        }

        SchedulerExit::Completed
    }
}
