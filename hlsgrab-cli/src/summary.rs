// Download summary printed after the file is saved.

use hlsgrab_engine::{DownloadOutcome, OutputContainer};
use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::utils::size_in_mb;

#[derive(Debug, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub path: String,
    pub mime_type: &'static str,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub completed_at: String,
    pub total_segments: usize,
    pub failed_segments: Vec<usize>,
}

impl FileSummary {
    pub fn new(
        name: &str,
        path: &Path,
        container: OutputContainer,
        outcome: &DownloadOutcome,
    ) -> Self {
        Self {
            name: name.to_string(),
            path: path.display().to_string(),
            mime_type: container.mime_type(),
            size_bytes: outcome.size,
            size_mb: size_in_mb(outcome.size),
            completed_at: outcome
                .completed_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            total_segments: outcome.total_segments,
            failed_segments: outcome.failed_segments.clone(),
        }
    }
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File: {}", self.name)?;
        writeln!(f, "Path: {}", self.path)?;
        writeln!(f, "Size: {:.2} MB", self.size_mb)?;
        writeln!(f, "Date: {}", self.completed_at)?;
        write!(
            f,
            "Failed segments: {} of {}",
            self.failed_segments.len(),
            self.total_segments
        )
    }
}
