//! # hlsgrab-engine
//!
//! A library for downloading on-demand HLS streams.
//!
//! ## Features
//!
//! - Master playlist resolution into renditions keyed by resolution label
//! - Bounded concurrent segment fetching with per-segment retry
//! - Reassembly in playlist order, tolerating failed segments
//! - Cooperative cancellation and progress reporting
//!
//! ## Example
//!
//! ```no_run
//! use hlsgrab_engine::HlsProtocolBuilder;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = HlsProtocolBuilder::new().download_concurrency(8).build()?;
//! let renditions = downloader
//!     .resolve_renditions("https://cdn.example.com/master.m3u8")
//!     .await?;
//! if let Some(rendition) = renditions.first() {
//!     let result = downloader
//!         .start_download(&rendition.uri, None, CancellationToken::new())
//!         .await?;
//!     if let Some(outcome) = result.into_outcome() {
//!         println!("{} bytes", outcome.size);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod downloader;
pub mod error;
pub mod hls;
pub mod protocol_builder;
pub mod proxy;
pub mod title;

pub use builder::DownloaderConfigBuilder;
pub use config::{DEFAULT_USER_AGENT, DownloaderConfig};
pub use downloader::create_client;
pub use error::DownloadError;
pub use protocol_builder::HlsProtocolBuilder;
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};
pub use title::{OutputContainer, derive_title, suggested_file_name};

pub use hls::{
    CancelPolicy, DownloadOutcome, DownloadProgress, DownloadResult, HlsConfig, HlsDownloader,
    HlsDownloaderError, OnProgress, Rendition, RenditionSet, RetryBackoff, progress_channel,
};
