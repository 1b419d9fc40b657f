use std::time::Duration;

use crate::DownloaderConfig;

// --- Top-Level Configuration ---
#[derive(Debug, Clone, Default)]
pub struct HlsConfig {
    /// Base downloader configuration
    pub base: DownloaderConfig,
    pub playlist_config: HlsPlaylistConfig,
    pub scheduler_config: HlsSchedulerConfig,
    pub fetcher_config: HlsFetcherConfig,
}

// --- Playlist Configuration ---
#[derive(Debug, Clone)]
pub struct HlsPlaylistConfig {
    /// Timeout for fetching a master or media playlist
    pub fetch_timeout: Duration,
}

impl Default for HlsPlaylistConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
        }
    }
}

// --- Scheduler Configuration ---
#[derive(Debug, Clone)]
pub struct HlsSchedulerConfig {
    pub download_concurrency: usize, // Max in-flight segment fetches
    pub cancel_policy: CancelPolicy,
}

impl Default for HlsSchedulerConfig {
    fn default() -> Self {
        Self {
            download_concurrency: 10,
            cancel_policy: CancelPolicy::default(),
        }
    }
}

/// What happens to in-flight fetches once cancellation is observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CancelPolicy {
    /// Let in-flight fetches finish and discard their results.
    #[default]
    Drain,
    /// Drop in-flight fetches immediately.
    Abandon,
}

// --- Fetcher Configuration ---
#[derive(Debug, Clone)]
pub struct HlsFetcherConfig {
    /// Timeout applied to each individual attempt
    pub segment_download_timeout: Duration,
    /// Total attempts per segment, including the first one
    pub max_segment_retries: u32,
    pub retry_backoff: RetryBackoff,
}

impl Default for HlsFetcherConfig {
    fn default() -> Self {
        Self {
            segment_download_timeout: Duration::from_secs(10),
            max_segment_retries: 3,
            retry_backoff: RetryBackoff::None,
        }
    }
}

/// Delay inserted between failed segment attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryBackoff {
    /// Retry immediately.
    #[default]
    None,
    Fixed(Duration),
    /// `base * 2^(attempt - 1)`
    Exponential { base: Duration },
}

impl RetryBackoff {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            RetryBackoff::None => Duration::ZERO,
            RetryBackoff::Fixed(delay) => delay,
            RetryBackoff::Exponential { base } => {
                base.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = HlsConfig::default();
        assert_eq!(config.scheduler_config.download_concurrency, 10);
        assert_eq!(config.scheduler_config.cancel_policy, CancelPolicy::Drain);
        assert_eq!(config.fetcher_config.max_segment_retries, 3);
        assert_eq!(
            config.fetcher_config.segment_download_timeout,
            Duration::from_secs(10)
        );
        assert_eq!(config.fetcher_config.retry_backoff, RetryBackoff::None);
    }

    #[test]
    fn test_backoff_delays() {
        assert_eq!(RetryBackoff::None.delay_after(2), Duration::ZERO);
        assert_eq!(
            RetryBackoff::Fixed(Duration::from_millis(250)).delay_after(5),
            Duration::from_millis(250)
        );
        let exp = RetryBackoff::Exponential {
            base: Duration::from_millis(100),
        };
        assert_eq!(exp.delay_after(1), Duration::from_millis(100));
        assert_eq!(exp.delay_after(3), Duration::from_millis(400));
    }
}
