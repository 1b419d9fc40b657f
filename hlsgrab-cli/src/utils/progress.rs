use hlsgrab_engine::{DownloadProgress, OnProgress};
use indicatif::{ProgressBar, ProgressStyle};
use std::{sync::Arc, time::Duration};

const SEGMENT_TEMPLATE: &str = "{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} segments ({percent}%) eta {eta}";

fn segment_style() -> ProgressStyle {
    ProgressStyle::with_template(SEGMENT_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Progress bar counting completed segments.
#[derive(Clone)]
pub struct ProgressManager {
    bar: Option<ProgressBar>,
}

impl ProgressManager {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(segment_style());
        bar.set_message("Downloading segments");
        bar.enable_steady_tick(Duration::from_millis(500));
        Self { bar: Some(bar) }
    }

    pub fn new_disabled() -> Self {
        Self { bar: None }
    }

    pub fn handle_progress(&self, progress: DownloadProgress) {
        let Some(bar) = &self.bar else {
            return;
        };
        bar.set_length(progress.total as u64);
        bar.set_position(progress.completed as u64);
        if progress.failed > 0 {
            bar.set_message(format!(
                "Downloading segments ({} failed)",
                progress.failed
            ));
        }
    }

    /// Callback to hand to the downloader, `None` when disabled.
    pub fn callback(&self) -> Option<OnProgress> {
        self.bar.as_ref()?;
        let manager = self.clone();
        Some(Arc::new(move |progress: DownloadProgress| {
            manager.handle_progress(progress)
        }))
    }

    pub fn finish(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.to_string());
        }
    }

    pub fn abandon(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.abandon_with_message(message.to_string());
        }
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.bar.is_none()
    }
}
