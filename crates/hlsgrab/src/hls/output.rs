// HLS Output: reassembles fetched segments in playlist order.

use crate::hls::fetcher::SegmentResult;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Local};

/// Concatenate the payloads of `slots` strictly by index.
///
/// Failed and unfilled slots are skipped: no padding, no error.
pub fn assemble(slots: &[Option<SegmentResult>]) -> Bytes {
    let payloads = || slots.iter().flatten().filter_map(SegmentResult::payload);

    let capacity = payloads().map(Bytes::len).sum();
    let mut output = BytesMut::with_capacity(capacity);
    for payload in payloads() {
        output.extend_from_slice(payload);
    }
    output.freeze()
}

/// Indices of slots that hold no payload, in ascending order.
pub fn failed_indices(slots: &[Option<SegmentResult>]) -> Vec<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| !matches!(slot, Some(SegmentResult::Bytes(_))))
        .map(|(index, _)| index)
        .collect()
}

/// The reassembled stream and its metadata.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub data: Bytes,
    pub size: u64,
    pub completed_at: DateTime<Local>,
    pub total_segments: usize,
    /// Segments missing from `data`
    pub failed_segments: Vec<usize>,
}

impl DownloadOutcome {
    pub fn from_slots(slots: &[Option<SegmentResult>]) -> Self {
        let data = assemble(slots);
        Self {
            size: data.len() as u64,
            data,
            completed_at: Local::now(),
            total_segments: slots.len(),
            failed_segments: failed_indices(slots),
        }
    }

    /// Whether every segment made it into the stream.
    pub fn is_complete(&self) -> bool {
        self.failed_segments.is_empty()
    }
}

/// Final result of a download that did not error out.
#[derive(Debug, Clone)]
pub enum DownloadResult {
    Completed(DownloadOutcome),
    /// Stopped at a completion boundary after the cancel signal was raised
    Cancelled { completed: usize, total: usize },
}

impl DownloadResult {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadResult::Cancelled { .. })
    }

    pub fn into_outcome(self) -> Option<DownloadOutcome> {
        match self {
            DownloadResult::Completed(outcome) => Some(outcome),
            DownloadResult::Cancelled { .. } => None,
        }
    }
}
