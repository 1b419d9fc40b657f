use std::sync::Arc;
use tokio::sync::mpsc;

/// Snapshot reported after each recorded segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Segments recorded so far, successful or failed
    pub completed: usize,
    pub total: usize,
    /// Segments that exhausted their retries
    pub failed: usize,
    /// Payload bytes received so far
    pub bytes_downloaded: u64,
}

impl DownloadProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// A callback function for progress updates.
///
/// Invoked from the coordinating task, one call at a time, with
/// monotonically increasing `completed`.
pub type OnProgress = Arc<dyn Fn(DownloadProgress) + Send + Sync>;

/// Forward progress into a channel drained by a single consumer.
pub fn progress_channel() -> (OnProgress, mpsc::UnboundedReceiver<DownloadProgress>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let on_progress: OnProgress = Arc::new(move |progress: DownloadProgress| {
        // Receiver gone means nobody is listening any more
        let _ = tx.send(progress);
    });
    (on_progress, rx)
}
