use std::time::{Duration, Instant};

use clap::Parser;
use error::AppError;
use hlsgrab_engine::{
    DownloadResult, DownloaderConfig, HlsDownloader, HlsProtocolBuilder, ProxyConfig,
    RenditionSet, RetryBackoff,
};
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;
mod error;
mod summary;
mod utils;

use cli::CliArgs;
use summary::FileSummary;
use utils::progress::ProgressManager;

/// Exit status after Ctrl-C, as shells report SIGINT.
const EXIT_CANCELLED: i32 = 130;

fn main() {
    match bootstrap() {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            // Log the full error for debugging
            error!(error = ?e, "Application failed");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn bootstrap() -> Result<i32, AppError> {
    // Parse command-line arguments
    let args = CliArgs::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("hlsgrab.log")?;
    let (file_writer, _log_guard) = tracing_appender::non_blocking(log_file);
    let multi_writer = MakeWriterExt::and(std::io::stderr, file_writer);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(multi_writer)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    let downloader = build_downloader(&args)?;

    let renditions = downloader.resolve_renditions(&args.url).await?;
    if args.list {
        print_renditions(&renditions, args.json)?;
        return Ok(0);
    }

    let rendition = select_rendition(&renditions, args.resolution.as_deref())?;
    info!(
        label = %rendition.label,
        uri = %rendition.uri,
        "Selected rendition"
    );
    let file_name = utils::output_file_name(&args.url, args.name.as_deref(), args.container)?;

    // Ctrl-C flips the token, the engine checks it between segments
    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, ctrl_c_token).await {
            std::process::exit(EXIT_CANCELLED);
        }
    });

    let progress_manager = if args.show_progress {
        ProgressManager::new()
    } else {
        ProgressManager::new_disabled()
    };

    let start_time = Instant::now();
    let result = downloader
        .start_download(&rendition.uri, progress_manager.callback(), cancel)
        .await;

    let outcome = match result {
        Ok(DownloadResult::Completed(outcome)) => {
            progress_manager.finish("Download finished");
            outcome
        }
        Ok(DownloadResult::Cancelled { completed, total }) => {
            progress_manager.abandon("Download cancelled");
            info!(completed, total, "Download cancelled by user");
            println!("Download cancelled");
            return Ok(EXIT_CANCELLED);
        }
        Err(e) => {
            progress_manager.abandon("Download failed");
            return Err(e.into());
        }
    };

    let path = utils::write_output(&args.output_dir, &file_name, &outcome.data).await?;
    info!(
        path = %path.display(),
        size = %utils::format_bytes(outcome.size),
        duration = ?start_time.elapsed(),
        "Saved download"
    );

    let summary = FileSummary::new(&file_name, &path, args.container, &outcome);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }

    if !outcome.is_complete() {
        warn!(
            failed = outcome.failed_segments.len(),
            total = outcome.total_segments,
            "Saved file is missing segments"
        );
        if args.strict {
            return Err(AppError::Incomplete {
                failed: outcome.failed_segments.len(),
                total: outcome.total_segments,
            });
        }
    }

    Ok(0)
}

/// Cancel on the first interrupt. Returns `true` on a second one, when the
/// caller should exit without waiting for in-flight segments.
async fn watch_interrupts<F, Fut>(mut next_interrupt: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_interrupt().await.is_err() {
        return false;
    }
    info!("Interrupt received, cancelling download (press Ctrl-C again to exit now)");
    cancel.cancel();

    if next_interrupt().await.is_err() {
        return false;
    }
    warn!("Second interrupt received, exiting immediately");
    true
}

/// Map CLI flags onto the engine configuration.
fn build_downloader(args: &CliArgs) -> Result<HlsDownloader, AppError> {
    let mut builder = DownloaderConfig::builder()
        .with_headers(utils::parse_headers(&args.headers))
        .with_system_proxy(!args.no_proxy);

    if let Some(user_agent) = &args.user_agent {
        builder = builder.with_user_agent(user_agent.clone());
    }

    // Handle proxy configuration
    if let Some(proxy_url) = &args.proxy {
        let proxy = ProxyConfig::from_url(proxy_url.clone());
        info!(
            proxy_url = %proxy.url,
            proxy_type = ?proxy.proxy_type,
            "Using explicit proxy configuration for downloads"
        );
        builder = builder.with_proxy(proxy);
    } else if args.no_proxy {
        info!("All proxy settings disabled (--no-proxy flag)");
    }

    let retry_backoff = if args.retry_delay_ms > 0 {
        RetryBackoff::Fixed(Duration::from_millis(args.retry_delay_ms))
    } else {
        RetryBackoff::None
    };

    let concurrency = usize::try_from(args.concurrency)
        .map_err(|_| AppError::InvalidInput("Invalid concurrency".to_string()))?;

    let downloader = HlsProtocolBuilder::new()
        .with_base_config(builder.build())
        .download_concurrency(concurrency)
        .cancel_policy(args.cancel_policy)
        .segment_timeout(Duration::from_secs(args.segment_timeout))
        .segment_retry_count(args.retries)
        .retry_backoff(retry_backoff)
        .build()?;
    Ok(downloader)
}

/// Pick the rendition named by `label`, or the first one when no label is given.
fn select_rendition<'a>(
    renditions: &'a RenditionSet,
    label: Option<&str>,
) -> Result<&'a hlsgrab_engine::Rendition, AppError> {
    let selected = match label {
        Some(label) => renditions.get(label),
        None => renditions.first(),
    };
    selected.ok_or_else(|| {
        let available = renditions.labels().collect::<Vec<_>>().join(", ");
        AppError::InvalidInput(format!(
            "Resolution '{}' is not available. Available: {available}",
            label.unwrap_or_default()
        ))
    })
}

fn print_renditions(renditions: &RenditionSet, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(renditions)?);
        return Ok(());
    }

    for rendition in renditions {
        let bandwidth = rendition
            .bandwidth
            .map(|b| format!("{} kbit/s", b / 1000))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<12} {:>14}  {}", rendition.label, bandwidth, rendition.uri);
    }
    Ok(())
}
