// Output naming: derives a filesystem-friendly title from the source URL.

use chrono::Local;
use percent_encoding::percent_decode_str;
use url::Url;

const PLAYLIST_EXTENSION: &str = ".m3u8";

/// Container the reassembled stream is saved as.
///
/// The bytes are never remuxed, the container only picks the file extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputContainer {
    #[default]
    Mp4,
    Ts,
}

impl OutputContainer {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputContainer::Mp4 => "mp4",
            OutputContainer::Ts => "ts",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputContainer::Mp4 => "video/mp4",
            OutputContainer::Ts => "video/mp2t",
        }
    }
}

/// Last path component of `raw`, ignoring query and fragment. Still percent-encoded.
fn last_path_component(raw: &str) -> String {
    if let Ok(url) = Url::parse(raw) {
        return url
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_owned))
            .unwrap_or_default();
    }

    let path = raw.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default().to_owned()
}

/// Derive a title from the playlist URL.
///
/// Takes the last path component, strips a trailing `.m3u8`, percent-decodes
/// it and replaces spaces and path separators with underscores. Never returns
/// an empty string.
pub fn derive_title(url: &str) -> String {
    let component = last_path_component(url);
    let stem = component
        .strip_suffix(PLAYLIST_EXTENSION)
        .unwrap_or(component.as_str());
    // Decoded separators must not turn the title into a path
    let title = percent_decode_str(stem)
        .decode_utf8_lossy()
        .replace([' ', '/', '\\'], "_");

    if title.is_empty() {
        format!("video_{}", Local::now().format("%Y%m%d_%H%M%S"))
    } else {
        title
    }
}

/// `derive_title(url)` plus the container extension.
pub fn suggested_file_name(url: &str, container: OutputContainer) -> String {
    format!("{}.{}", derive_title(url), container.extension())
}
