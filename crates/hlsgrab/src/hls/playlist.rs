// HLS Playlist Engine: fetches and parses master and media playlists.

use crate::hls::HlsDownloaderError;
use crate::hls::config::HlsConfig;
use async_trait::async_trait;
use m3u8_rs::{MasterPlaylist, MediaPlaylist, Playlist, parse_playlist_res};
use reqwest::Client;
use reqwest::header::{REFERER, USER_AGENT};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Label used when a rendition has no known resolution.
pub const DEFAULT_RENDITION: &str = "default";

#[async_trait]
pub trait PlaylistProvider: Send + Sync {
    /// Fetch `url` and list its selectable renditions.
    async fn resolve_renditions(&self, url: &str) -> Result<RenditionSet, HlsDownloaderError>;

    /// Fetch the media playlist at `url` and resolve its segment list.
    async fn load_media_playlist(
        &self,
        url: &str,
    ) -> Result<MediaPlaylistDetails, HlsDownloaderError>;
}

/// One selectable quality variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendition {
    /// `WxH`, or [`DEFAULT_RENDITION`]
    pub label: String,
    /// Absolute URI of the rendition's media playlist
    pub uri: String,
    pub bandwidth: Option<u64>,
}

/// Renditions keyed by label.
///
/// Labels keep the position of their first insertion. Inserting an existing
/// label replaces the earlier rendition (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RenditionSet {
    renditions: Vec<Rendition>,
}

impl RenditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-entry set used when the source is already a media playlist.
    pub fn single(uri: impl Into<String>) -> Self {
        let mut set = Self::new();
        set.insert(Rendition {
            label: DEFAULT_RENDITION.to_string(),
            uri: uri.into(),
            bandwidth: None,
        });
        set
    }

    pub fn insert(&mut self, rendition: Rendition) {
        match self
            .renditions
            .iter_mut()
            .find(|existing| existing.label == rendition.label)
        {
            Some(existing) => {
                debug!(
                    label = %rendition.label,
                    replaced = %existing.uri,
                    "Duplicate rendition label, keeping the later one"
                );
                *existing = rendition;
            }
            None => self.renditions.push(rendition),
        }
    }

    pub fn get(&self, label: &str) -> Option<&Rendition> {
        self.renditions.iter().find(|r| r.label == label)
    }

    pub fn first(&self) -> Option<&Rendition> {
        self.renditions.first()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.renditions.iter().map(|r| r.label.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rendition> {
        self.renditions.iter()
    }

    pub fn len(&self) -> usize {
        self.renditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renditions.is_empty()
    }
}

impl<'a> IntoIterator for &'a RenditionSet {
    type Item = &'a Rendition;
    type IntoIter = std::slice::Iter<'a, Rendition>;

    fn into_iter(self) -> Self::IntoIter {
        self.renditions.iter()
    }
}

/// One media segment, positioned by its index in the playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRef {
    pub index: usize,
    pub uri: Url,
}

#[derive(Debug, Clone)]
pub struct MediaPlaylistDetails {
    /// URL the media playlist was fetched from
    pub url: String,
    /// Directory portion of `url`, including the trailing slash
    pub base_url: String,
    pub segments: Vec<SegmentRef>,
}

/// Directory portion of a playlist URL: everything up to and including the last `/`.
pub fn base_uri(playlist_url: &str) -> String {
    match playlist_url.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/"),
        None => format!("{playlist_url}/"),
    }
}

/// Build the rendition set of a master playlist fetched from `playlist_url`.
pub fn renditions_from_master(
    master: &MasterPlaylist,
    playlist_url: &Url,
) -> Result<RenditionSet, url::ParseError> {
    let mut set = RenditionSet::new();
    for variant in master.variants.iter().filter(|v| !v.is_i_frame) {
        let label = variant
            .resolution
            .map(|r| format!("{}x{}", r.width, r.height))
            .unwrap_or_else(|| DEFAULT_RENDITION.to_string());
        let uri = playlist_url.join(&variant.uri)?;
        set.insert(Rendition {
            label,
            uri: uri.to_string(),
            bandwidth: Some(variant.bandwidth),
        });
    }
    Ok(set)
}

/// Resolve every segment of `playlist` against the directory of `playlist_url`.
pub fn media_details(
    playlist_url: &str,
    playlist: &MediaPlaylist,
) -> Result<MediaPlaylistDetails, HlsDownloaderError> {
    let base_url = base_uri(playlist_url);
    let base = Url::parse(&base_url).map_err(|e| {
        HlsDownloaderError::resolve(playlist_url, format!("invalid base URL {base_url}: {e}"))
    })?;

    let segments = playlist
        .segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            base.join(&segment.uri)
                .map(|uri| SegmentRef { index, uri })
                .map_err(|e| {
                    HlsDownloaderError::resolve(
                        playlist_url,
                        format!("could not resolve segment URI {}: {e}", segment.uri),
                    )
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MediaPlaylistDetails {
        url: playlist_url.to_string(),
        base_url,
        segments,
    })
}

pub struct PlaylistEngine {
    http_client: Client,
    config: Arc<HlsConfig>,
}

impl PlaylistEngine {
    pub fn new(http_client: Client, config: Arc<HlsConfig>) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Fetch and parse a playlist. The request carries the configured
    /// User-Agent and `Referer: <url>`, whatever client it is sent on.
    async fn fetch_playlist(&self, url: &Url) -> Result<Playlist, HlsDownloaderError> {
        let response = self
            .http_client
            .get(url.clone())
            .header(USER_AGENT, self.config.base.user_agent.as_str())
            .header(REFERER, url.as_str())
            .timeout(self.config.playlist_config.fetch_timeout)
            .send()
            .await
            .map_err(|e| HlsDownloaderError::resolve(url.as_str(), e))?;

        if !response.status().is_success() {
            return Err(HlsDownloaderError::resolve(
                url.as_str(),
                format!("HTTP {}", response.status()),
            ));
        }

        let playlist_bytes = response
            .bytes()
            .await
            .map_err(|e| HlsDownloaderError::resolve(url.as_str(), e))?;

        parse_playlist_res(&playlist_bytes).map_err(|e| {
            HlsDownloaderError::resolve(url.as_str(), format!("unparseable playlist: {e}"))
        })
    }
}

fn parse_url(url: &str) -> Result<Url, HlsDownloaderError> {
    Url::parse(url).map_err(|e| HlsDownloaderError::resolve(url, format!("invalid URL: {e}")))
}

#[async_trait]
impl PlaylistProvider for PlaylistEngine {
    async fn resolve_renditions(&self, url: &str) -> Result<RenditionSet, HlsDownloaderError> {
        let playlist_url = parse_url(url)?;
        match self.fetch_playlist(&playlist_url).await? {
            Playlist::MasterPlaylist(master) => {
                let set = renditions_from_master(&master, &playlist_url).map_err(|e| {
                    HlsDownloaderError::resolve(url, format!("bad rendition URI: {e}"))
                })?;
                if set.is_empty() {
                    return Err(HlsDownloaderError::resolve(
                        url,
                        "master playlist has no renditions",
                    ));
                }
                info!(url, renditions = set.len(), "Resolved master playlist");
                Ok(set)
            }
            Playlist::MediaPlaylist(_) => {
                debug!(url, "Source is a media playlist");
                Ok(RenditionSet::single(url))
            }
        }
    }

    async fn load_media_playlist(
        &self,
        url: &str,
    ) -> Result<MediaPlaylistDetails, HlsDownloaderError> {
        let playlist_url = parse_url(url)?;
        match self.fetch_playlist(&playlist_url).await? {
            Playlist::MediaPlaylist(media) => {
                let details = media_details(url, &media)?;
                debug!(
                    url,
                    base_url = %details.base_url,
                    segments = details.segments.len(),
                    "Loaded media playlist"
                );
                Ok(details)
            }
            Playlist::MasterPlaylist(_) => Err(HlsDownloaderError::resolve(
                url,
                "expected a media playlist, got a master playlist",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=1400000,RESOLUTION=1280x720
mid/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1920x1080
https://cdn.example.com/high/index.m3u8
";

    fn parse_master(text: &str) -> MasterPlaylist {
        match parse_playlist_res(text.as_bytes()) {
            Ok(Playlist::MasterPlaylist(pl)) => pl,
            other => panic!("expected master playlist, got {other:?}"),
        }
    }

    fn parse_media(text: &str) -> MediaPlaylist {
        match parse_playlist_res(text.as_bytes()) {
            Ok(Playlist::MediaPlaylist(pl)) => pl,
            other => panic!("expected media playlist, got {other:?}"),
        }
    }

    #[test]
    fn test_master_renditions_are_joined_against_playlist_url() {
        let url = Url::parse("http://x/streams/master.m3u8?token=1").unwrap();
        let set = renditions_from_master(&parse_master(MASTER), &url).unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(
            set.get("640x360").unwrap().uri,
            "http://x/streams/low/index.m3u8"
        );
        assert_eq!(
            set.get("1280x720").unwrap().uri,
            "http://x/streams/mid/index.m3u8"
        );
        assert_eq!(
            set.get("1920x1080").unwrap().uri,
            "https://cdn.example.com/high/index.m3u8"
        );
        assert_eq!(set.get("640x360").unwrap().bandwidth, Some(800000));
    }

    #[test]
    fn test_duplicate_resolution_keeps_last_rendition() {
        let text = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=1280x720
a.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=400000,RESOLUTION=640x360
b.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=1600000,RESOLUTION=1280x720
c.m3u8
";
        let url = Url::parse("http://x/hls/master.m3u8").unwrap();
        let set = renditions_from_master(&parse_master(text), &url).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("1280x720").unwrap().uri, "http://x/hls/c.m3u8");
        // The label keeps its original position
        assert_eq!(set.labels().collect::<Vec<_>>(), ["1280x720", "640x360"]);
    }

    #[test]
    fn test_variant_without_resolution_is_default() {
        let text = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=64000,CODECS=\"mp4a.40.2\"
audio.m3u8
";
        let url = Url::parse("http://x/hls/master.m3u8").unwrap();
        let set = renditions_from_master(&parse_master(text), &url).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(DEFAULT_RENDITION).unwrap().uri, "http://x/hls/audio.m3u8");
    }

    #[test]
    fn test_single_set_for_media_playlist() {
        let set = RenditionSet::single("http://x/hls/index.m3u8");
        assert_eq!(set.len(), 1);
        assert_eq!(set.first().unwrap().label, "default");
        assert_eq!(set.first().unwrap().uri, "http://x/hls/index.m3u8");
    }

    #[test]
    fn test_base_uri() {
        assert_eq!(base_uri("http://x/hls/index.m3u8"), "http://x/hls/");
        assert_eq!(base_uri("http://x/hls/"), "http://x/hls/");
        assert_eq!(base_uri("index.m3u8"), "index.m3u8/");
    }

    #[test]
    fn test_media_segments_resolved_in_order() {
        let text = "#EXTM3U
#EXT-X-TARGETDURATION:10
#EXT-X-MEDIA-SEQUENCE:0
#EXTINF:10.0,
seg0.ts
#EXTINF:10.0,
sub/seg1.ts
#EXTINF:10.0,
https://cdn.example.com/seg2.ts
#EXT-X-ENDLIST
";
        let details = media_details("http://x/hls/index.m3u8", &parse_media(text)).unwrap();

        assert_eq!(details.base_url, "http://x/hls/");
        let uris: Vec<_> = details.segments.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(
            uris,
            [
                "http://x/hls/seg0.ts",
                "http://x/hls/sub/seg1.ts",
                "https://cdn.example.com/seg2.ts"
            ]
        );
        let indices: Vec<_> = details.segments.iter().map(|s| s.index).collect();
        assert_eq!(indices, [0, 1, 2]);
    }

    #[test]
    fn test_media_details_rejects_relative_base() {
        let text = "#EXTM3U
#EXT-X-TARGETDURATION:10
#EXTINF:10.0,
seg0.ts
";
        let err = media_details("index.m3u8", &parse_media(text)).unwrap_err();
        assert!(matches!(err, HlsDownloaderError::Resolve { .. }));
    }
}
