#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum HlsDownloaderError {
    /// The playlist could not be fetched or parsed. Never retried.
    #[error("Failed to resolve playlist {url}: {reason}")]
    Resolve { url: String, reason: String },
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl HlsDownloaderError {
    pub(crate) fn resolve(url: impl Into<String>, reason: impl ToString) -> Self {
        HlsDownloaderError::Resolve {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
