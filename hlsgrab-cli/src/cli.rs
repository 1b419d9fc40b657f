use clap::Parser;
use hlsgrab_engine::{CancelPolicy, OutputContainer};
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    author = "hua0512 <https://github.com/hua0512>",
    version,
    about = "Download an HLS stream into a single video file",
    long_about = "Resolves an HLS master or media playlist, downloads every segment of the\n\
                  selected rendition concurrently and joins them in playlist order.\n\
                  \n\
                  Segments that still fail after all retries are skipped; the summary\n\
                  reports how many were lost. Use --strict to treat that as an error."
)]
pub struct CliArgs {
    /// Master or media playlist URL
    #[arg(required = true, help = "URL of the .m3u8 master or media playlist")]
    pub url: String,

    /// Only list the available renditions
    #[arg(long, help = "List available renditions and exit")]
    pub list: bool,

    /// Rendition to download
    #[arg(
        short,
        long,
        value_name = "WxH",
        help = "Resolution label to download, e.g. 1280x720 (default: first listed rendition)"
    )]
    pub resolution: Option<String>,

    /// Output directory
    #[arg(
        short,
        long,
        default_value = "downloads",
        help = "Directory where the video is saved (created if missing)"
    )]
    pub output_dir: PathBuf,

    /// Output name without extension
    #[arg(
        short = 'n',
        long = "name",
        help = "Output file name without extension (default: derived from the URL)"
    )]
    pub name: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputContainer::Mp4, help = "Extension of the saved file")]
    pub container: OutputContainer,

    /// Number of concurrent segment downloads
    #[arg(
        short = 'c',
        long,
        default_value = "10",
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Maximum number of concurrent segment downloads"
    )]
    pub concurrency: u32,

    /// Attempts per segment
    #[arg(
        long,
        default_value = "3",
        help = "Total download attempts per segment before it is skipped"
    )]
    pub retries: u32,

    /// Segment timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Timeout for a single segment attempt in seconds"
    )]
    pub segment_timeout: u64,

    #[arg(
        long,
        default_value = "0",
        help = "Delay between segment attempts in milliseconds (0 retries immediately)"
    )]
    pub retry_delay_ms: u64,

    #[arg(
        long,
        value_enum,
        default_value_t = CancelPolicy::Drain,
        help = "What to do with in-flight segments when the download is cancelled"
    )]
    pub cancel_policy: CancelPolicy,

    /// Custom HTTP headers for download requests
    #[arg(
        long = "header",
        short = 'H',
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    #[arg(long, help = "User agent sent with playlist and segment requests")]
    pub user_agent: Option<String>,

    /// Proxy URL (e.g., "http://proxy.example.com:8080")
    #[arg(
        long,
        help = "Proxy server URL, the scheme selects the type (http, https, socks5)"
    )]
    pub proxy: Option<String>,

    /// Disable all proxy settings for downloads
    #[arg(
        long,
        conflicts_with = "proxy",
        help = "Disable all proxy settings (including system proxy) for downloads"
    )]
    pub no_proxy: bool,

    /// Show progress bar
    #[arg(
        short = 'P',
        long = "progress",
        help = "Show a progress bar while segments download"
    )]
    pub show_progress: bool,

    #[arg(long, help = "Print the rendition list or download summary as JSON")]
    pub json: bool,

    #[arg(long, help = "Exit with an error if any segment could not be downloaded")]
    pub strict: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,
}
