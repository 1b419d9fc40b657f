// HLS segmented download engine

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod hls_downloader;
pub mod output;
pub mod playlist;
pub mod scheduler;

// Re-exports for easier access
pub use config::{CancelPolicy, HlsConfig, RetryBackoff};
pub use coordinator::HlsStreamCoordinator;
pub use error::HlsDownloaderError;
pub use events::{DownloadProgress, OnProgress, progress_channel};
pub use fetcher::{SegmentDownloader, SegmentFetcher, SegmentResult};
pub use hls_downloader::HlsDownloader;
pub use output::{DownloadOutcome, DownloadResult, assemble};
pub use playlist::{
    MediaPlaylistDetails, PlaylistEngine, PlaylistProvider, Rendition, RenditionSet, SegmentRef,
};
