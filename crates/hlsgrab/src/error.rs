use crate::hls::HlsDownloaderError;

/// Errors raised while setting up or driving a download.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("TLS configuration error: {0}")]
    TlsError(#[from] rustls::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid proxy configuration: {0}")]
    ProxyError(String),

    #[error("HLS error: {0}")]
    HlsError(#[from] HlsDownloaderError),
}
