//! End-to-end download tests against a local HLS origin.

use axum::{
    Router,
    extract::{Path, State},
    http::{
        HeaderMap, HeaderName, StatusCode,
        header::{REFERER, USER_AGENT},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use hlsgrab_engine::{
    DownloadResult, HlsConfig, HlsDownloader, HlsDownloaderError, HlsProtocolBuilder,
    progress_channel,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use url::Url;

const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720
hls/index.m3u8
";

const MEDIA: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:4
#EXT-X-MEDIA-SEQUENCE:0
#EXTINF:4.0,
seg0.ts
#EXTINF:4.0,
seg1.ts
#EXTINF:4.0,
seg2.ts
#EXT-X-ENDLIST
";

const STALL: Duration = Duration::from_secs(2);

/// Request log and failure script shared with the handlers.
#[derive(Default)]
struct Origin {
    /// Requests to `seg1.ts` that answer 500 before it starts succeeding
    seg1_failures: usize,
    /// Requests to `seg1.ts` that stall for [`STALL`] before answering
    seg1_stalls: usize,
    seg1_hits: AtomicUsize,
    /// `(path, referer, user agent)` per request
    requests: Mutex<Vec<(String, String, String)>>,
}

impl Origin {
    fn log(&self, path: &str, headers: &HeaderMap) {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        self.requests
            .lock()
            .push((path.to_string(), header(REFERER), header(USER_AGENT)));
    }
}

async fn master(State(origin): State<Arc<Origin>>, headers: HeaderMap) -> &'static str {
    origin.log("/master.m3u8", &headers);
    MASTER
}

async fn hls_file(
    State(origin): State<Arc<Origin>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    origin.log(&format!("/hls/{name}"), &headers);
    match name.as_str() {
        "index.m3u8" => MEDIA.into_response(),
        "seg0.ts" => "A".into_response(),
        "seg1.ts" => {
            let hit = origin.seg1_hits.fetch_add(1, Ordering::SeqCst);
            if hit < origin.seg1_stalls {
                tokio::time::sleep(STALL).await;
            }
            if hit < origin.seg1_failures {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            } else {
                "B".into_response()
            }
        }
        "seg2.ts" => "C".into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

struct TestServer {
    base_url: Url,
    origin: Arc<Origin>,
}

impl TestServer {
    async fn start(origin: Origin) -> Self {
        let origin = Arc::new(origin);
        let router = Router::new()
            .route("/master.m3u8", get(master))
            .route("/hls/{name}", get(hls_file))
            .route("/broken.m3u8", get(|| async { StatusCode::FORBIDDEN }))
            .route("/garbage.m3u8", get(|| async { "<html>not a playlist</html>" }))
            .with_state(Arc::clone(&origin));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).unwrap(),
            origin,
        }
    }

    fn url(&self, path: &str) -> String {
        self.base_url.join(path).unwrap().to_string()
    }

    fn requests_to(&self, path: &str) -> Vec<(String, String, String)> {
        self.origin
            .requests
            .lock()
            .iter()
            .filter(|(p, _, _)| p == path)
            .cloned()
            .collect()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn build(builder: HlsProtocolBuilder) -> HlsDownloader {
    init_tracing();
    // Keep environment proxies away from localhost
    builder.use_system_proxy(false).build().unwrap()
}

fn downloader() -> HlsDownloader {
    build(HlsProtocolBuilder::new())
}

#[tokio::test]
async fn test_resolves_master_into_absolute_renditions() {
    let server = TestServer::start(Origin::default()).await;

    let set = downloader()
        .resolve_renditions(&server.url("/master.m3u8"))
        .await
        .unwrap();

    assert_eq!(set.labels().collect::<Vec<_>>(), ["640x360", "1280x720"]);
    assert_eq!(set.get("640x360").unwrap().uri, server.url("/low/index.m3u8"));
    assert_eq!(set.get("1280x720").unwrap().uri, server.url("/hls/index.m3u8"));
    assert_eq!(set.get("1280x720").unwrap().bandwidth, Some(2_800_000));

    let requests = server.requests_to("/master.m3u8");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1, server.url("/master.m3u8"));
}

#[tokio::test]
async fn test_media_playlist_resolves_to_default_rendition() {
    let server = TestServer::start(Origin::default()).await;
    let url = server.url("/hls/index.m3u8");

    let set = downloader().resolve_renditions(&url).await.unwrap();

    assert_eq!(set.len(), 1);
    assert_eq!(set.get("default").unwrap().uri, url);
}

#[tokio::test]
async fn test_downloads_segments_in_playlist_order() {
    let server = TestServer::start(Origin::default()).await;
    let playlist = server.url("/hls/index.m3u8");
    let (on_progress, mut progress) = progress_channel();

    let result = downloader()
        .start_download(&playlist, Some(on_progress), CancellationToken::new())
        .await
        .unwrap();

    let outcome = result.into_outcome().unwrap();
    assert_eq!(outcome.data.as_ref(), b"ABC");
    assert_eq!(outcome.size, 3);
    assert_eq!(outcome.total_segments, 3);
    assert!(outcome.failed_segments.is_empty());

    for segment in ["/hls/seg0.ts", "/hls/seg1.ts", "/hls/seg2.ts"] {
        let requests = server.requests_to(segment);
        assert_eq!(requests.len(), 1, "{segment}");
        assert_eq!(requests[0].1, playlist);
        assert_eq!(requests[0].2, "Mozilla/5.0");
    }

    let mut completed = Vec::new();
    while let Ok(p) = progress.try_recv() {
        completed.push(p.completed);
        assert_eq!(p.total, 3);
    }
    assert_eq!(completed, [1, 2, 3]);
}

#[tokio::test]
async fn test_segment_recovers_on_third_attempt() {
    let server = TestServer::start(Origin {
        seg1_failures: 2,
        ..Default::default()
    })
    .await;

    let outcome = downloader()
        .start_download(&server.url("/hls/index.m3u8"), None, CancellationToken::new())
        .await
        .unwrap()
        .into_outcome()
        .unwrap();

    assert_eq!(outcome.data.as_ref(), b"ABC");
    assert_eq!(server.origin.seg1_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhausted_segment_is_skipped() {
    let server = TestServer::start(Origin {
        seg1_failures: usize::MAX,
        ..Default::default()
    })
    .await;

    let outcome = downloader()
        .start_download(&server.url("/hls/index.m3u8"), None, CancellationToken::new())
        .await
        .unwrap()
        .into_outcome()
        .unwrap();

    assert_eq!(outcome.data.as_ref(), b"AC");
    assert_eq!(outcome.failed_segments, [1]);
    // Three attempts in total, no fourth
    assert_eq!(server.origin.seg1_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_cancelled_download_returns_no_outcome() {
    let server = TestServer::start(Origin::default()).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = downloader()
        .start_download(&server.url("/hls/index.m3u8"), None, cancel)
        .await
        .unwrap();

    assert!(matches!(
        result,
        DownloadResult::Cancelled {
            completed: 0,
            total: 3
        }
    ));
}

#[tokio::test]
async fn test_playlist_failures_are_resolve_errors() {
    let server = TestServer::start(Origin::default()).await;
    let downloader = downloader();

    for path in ["/broken.m3u8", "/garbage.m3u8", "/missing.m3u8"] {
        let url = server.url(path);
        let err = downloader.resolve_renditions(&url).await.unwrap_err();
        match err {
            HlsDownloaderError::Resolve { url: failed, .. } => assert_eq!(failed, url),
            other => panic!("expected resolve error for {path}, got {other:?}"),
        }
    }

    let err = downloader
        .start_download(&server.url("/broken.m3u8"), None, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HlsDownloaderError::Resolve { .. }));
}

#[tokio::test]
async fn test_master_playlist_cannot_be_downloaded_directly() {
    let server = TestServer::start(Origin::default()).await;

    let err = downloader()
        .start_download(&server.url("/master.m3u8"), None, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, HlsDownloaderError::Resolve { .. }));
}

#[tokio::test]
async fn test_stalled_attempt_times_out_and_retries() {
    let server = TestServer::start(Origin {
        seg1_stalls: 1,
        ..Default::default()
    })
    .await;

    let outcome = build(HlsProtocolBuilder::new().segment_timeout(Duration::from_millis(200)))
        .start_download(&server.url("/hls/index.m3u8"), None, CancellationToken::new())
        .await
        .unwrap()
        .into_outcome()
        .unwrap();

    assert_eq!(outcome.data.as_ref(), b"ABC");
    assert_eq!(server.origin.seg1_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_always_stalling_segment_fails_after_three_attempts() {
    let server = TestServer::start(Origin {
        seg1_stalls: usize::MAX,
        ..Default::default()
    })
    .await;

    let outcome = build(HlsProtocolBuilder::new().segment_timeout(Duration::from_millis(200)))
        .start_download(&server.url("/hls/index.m3u8"), None, CancellationToken::new())
        .await
        .unwrap()
        .into_outcome()
        .unwrap();

    assert_eq!(outcome.data.as_ref(), b"AC");
    assert_eq!(outcome.failed_segments, [1]);
    assert_eq!(server.origin.seg1_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_shared_client_still_sends_configured_user_agent() {
    init_tracing();
    let server = TestServer::start(Origin::default()).await;
    // A caller-built client without a default user agent
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let downloader = HlsDownloader::with_client(HlsConfig::default(), client);

    downloader
        .resolve_renditions(&server.url("/master.m3u8"))
        .await
        .unwrap();
    downloader
        .start_download(&server.url("/hls/index.m3u8"), None, CancellationToken::new())
        .await
        .unwrap();

    for path in ["/master.m3u8", "/hls/index.m3u8", "/hls/seg0.ts"] {
        let requests = server.requests_to(path);
        assert!(!requests.is_empty(), "{path}");
        assert!(requests.iter().all(|(_, _, ua)| ua == "Mozilla/5.0"), "{path}");
    }
}
