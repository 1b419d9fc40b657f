use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download error: {0}")]
    Download(#[from] hlsgrab_engine::DownloadError),

    #[error("{0}")]
    Hls(#[from] hlsgrab_engine::HlsDownloaderError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{failed} of {total} segments could not be downloaded")]
    Incomplete { failed: usize, total: usize },
}
