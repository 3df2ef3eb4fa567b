//! `YouTube` video identifier resolution.
//!
//! Turns whatever the user pasted into the canonical pieces a playlist entry
//! needs: the 11-character video identifier, the embeddable player URL and a
//! thumbnail URL.
//!
//! # Recognized shapes
//!
//! - `https://youtu.be/<id>`
//! - `https://www.youtube.com/v/<id>`
//! - `https://www.youtube.com/user/name#p/u/1/<id>` (`u/<char>/<id>`)
//! - `https://www.youtube.com/embed/<id>`
//! - `https://www.youtube.com/watch?v=<id>`
//! - `...&v=<id>`
//!
//! Matching is a single regex pass, not URL parsing: anything before the
//! recognized prefix or after the token is ignored. When several prefixes
//! occur, the last one wins. A bare identifier without any prefix does not
//! resolve.
//!
//! # Failure policy
//!
//! Nothing here returns an error. The string functions return an empty
//! string when no identifier can be extracted and callers treat empty as
//! "reject".
//!
//! ```rust
//! use loopshare_core::resolver::{embed_url, extract_video_id};
//!
//! let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
//! assert_eq!(extract_video_id(url), "dQw4w9WgXcQ");
//! assert_eq!(embed_url(url), "https://www.youtube.com/embed/dQw4w9WgXcQ");
//! assert_eq!(extract_video_id("not a url"), "");
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Length of a `YouTube` video identifier.
pub const VIDEO_ID_LEN: usize = 11;

/// Base of every embeddable player URL.
pub const EMBED_BASE_URL: &str = "https://www.youtube.com/embed/";

/// Base of every thumbnail URL.
pub const THUMBNAIL_BASE_URL: &str = "https://img.youtube.com/vi/";

#[allow(clippy::expect_used)]
static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu.be/|v/|u/(?-u:\w)/|embed/|watch\?v=|&v=)([^#&?]*)")
        .expect("video id pattern is valid")
});

/// Thumbnail size published for every video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ThumbnailQuality {
    /// 120x90.
    #[serde(rename = "default")]
    Default,
    /// 320x180.
    #[serde(rename = "mqdefault")]
    MqDefault,
    /// 480x360.
    #[default]
    #[serde(rename = "hqdefault")]
    HqDefault,
    /// 640x480.
    #[serde(rename = "sddefault")]
    SdDefault,
    /// 1280x720. Not generated for every upload.
    #[serde(rename = "maxresdefault")]
    MaxResDefault,
}

impl ThumbnailQuality {
    /// Every quality tier, smallest first.
    pub const ALL: [Self; 5] = [
        Self::Default,
        Self::MqDefault,
        Self::HqDefault,
        Self::SdDefault,
        Self::MaxResDefault,
    ];

    /// File stem used in the thumbnail URL.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::MqDefault => "mqdefault",
            Self::HqDefault => "hqdefault",
            Self::SdDefault => "sddefault",
            Self::MaxResDefault => "maxresdefault",
        }
    }
}

impl fmt::Display for ThumbnailQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThumbnailQuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown thumbnail quality '{s}' (expected one of: default, mqdefault, hqdefault, sddefault, maxresdefault)"
                )
            })
    }
}

/// Everything derived from one accepted video URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVideo {
    /// The 11-character identifier.
    pub video_id: String,
    /// Embeddable player URL.
    pub embed_url: String,
    /// Thumbnail URL at the requested quality.
    pub thumbnail_url: String,
}

/// Resolve a URL into its identifier, embed URL and thumbnail URL.
///
/// Returns `None` when no identifier can be extracted.
#[must_use]
pub fn resolve(url: &str, quality: ThumbnailQuality) -> Option<ResolvedVideo> {
    let video_id = match_video_id(url)?;
    Some(ResolvedVideo {
        embed_url: format!("{EMBED_BASE_URL}{video_id}"),
        thumbnail_url: format!("{THUMBNAIL_BASE_URL}{video_id}/{quality}.jpg"),
        video_id: video_id.to_string(),
    })
}

fn match_video_id(url: &str) -> Option<&str> {
    let token = VIDEO_ID_RE.captures(url)?.get(2)?.as_str();
    // Length in UTF-16 code units, the way browsers measure the id.
    (token.encode_utf16().count() == VIDEO_ID_LEN).then_some(token)
}

/// Extract the video identifier, or an empty string.
#[must_use]
pub fn extract_video_id(url: &str) -> String {
    match_video_id(url).map(String::from).unwrap_or_default()
}

/// Canonical embeddable URL for `url`, or an empty string.
#[must_use]
pub fn embed_url(url: &str) -> String {
    resolve(url, ThumbnailQuality::default())
        .map(|r| r.embed_url)
        .unwrap_or_default()
}

/// Thumbnail URL for `url` at `quality`, or an empty string.
#[must_use]
pub fn thumbnail_url(url: &str, quality: ThumbnailQuality) -> String {
    resolve(url, quality)
        .map(|r| r.thumbnail_url)
        .unwrap_or_default()
}

/// Whether `url` yields a video identifier.
///
/// Front ends call this before offering to add a video.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    match_video_id(url).is_some()
}

/// Player URL that starts playback immediately and hides related videos.
#[must_use]
pub fn autoplay_url(embed_url: &str) -> String {
    if embed_url.is_empty() {
        String::new()
    } else {
        format!("{embed_url}?autoplay=1&rel=0")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn test_watch_url() {
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        assert_eq!(extract_video_id(url), ID);
        assert_eq!(embed_url(url), "https://www.youtube.com/embed/dQw4w9WgXcQ");
    }

    #[test]
    fn test_short_link_matches_watch_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_recognized_shapes() {
        let urls = [
            "https://youtu.be/dQw4w9WgXcQ?si=share",
            "https://www.youtube.com/v/dQw4w9WgXcQ?version=3",
            "https://www.youtube.com/user/someone#p/u/1/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ?start=10",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ#t=30",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ&list=PLxyz",
        ];
        for url in urls {
            assert_eq!(extract_video_id(url), ID, "failed for {url}");
            assert!(is_valid_url(url));
        }
    }

    #[test]
    fn test_rejected_inputs() {
        let inputs = [
            "",
            "not a url",
            "dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=short",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQtoolong",
            "https://example.com/video/123",
            "https://youtu.be/",
        ];
        for input in inputs {
            assert_eq!(extract_video_id(input), "", "accepted {input:?}");
            assert_eq!(embed_url(input), "");
            assert_eq!(thumbnail_url(input, ThumbnailQuality::HqDefault), "");
            assert!(!is_valid_url(input));
            assert!(resolve(input, ThumbnailQuality::default()).is_none());
        }
    }

    #[test]
    fn test_length_counts_utf16_units() {
        // One astral character is two UTF-16 units.
        assert_eq!(
            extract_video_id("https://youtu.be/\u{1F600}abcdefghi"),
            "\u{1F600}abcdefghi"
        );
        assert_eq!(extract_video_id("https://youtu.be/\u{1F600}abcdefghij"), "");
        // Characters from the basic plane count once.
        assert_eq!(extract_video_id("https://youtu.be/\u{e9}bcdefghijk"), "\u{e9}bcdefghijk");
    }

    #[test]
    fn test_thumbnail_varies_only_in_quality() {
        let url = "https://youtu.be/dQw4w9WgXcQ";
        for quality in ThumbnailQuality::ALL {
            assert_eq!(
                thumbnail_url(url, quality),
                format!("https://img.youtube.com/vi/dQw4w9WgXcQ/{}.jpg", quality.as_str())
            );
        }
        assert_eq!(
            thumbnail_url(url, ThumbnailQuality::default()),
            "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
    }

    #[test]
    fn test_functions_are_deterministic() {
        let url = "https://www.youtube.com/watch?v=fJ9rUzIMcZQ";
        assert_eq!(embed_url(url), embed_url(url));
        assert_eq!(
            thumbnail_url(url, ThumbnailQuality::SdDefault),
            thumbnail_url(url, ThumbnailQuality::SdDefault)
        );
    }

    #[test]
    fn test_resolve_bundles_all_parts() {
        let resolved = resolve(
            "https://www.youtube.com/watch?v=eIrMbAQSU34",
            ThumbnailQuality::MqDefault,
        )
        .unwrap();
        assert_eq!(resolved.video_id, "eIrMbAQSU34");
        assert_eq!(resolved.embed_url, "https://www.youtube.com/embed/eIrMbAQSU34");
        assert_eq!(
            resolved.thumbnail_url,
            "https://img.youtube.com/vi/eIrMbAQSU34/mqdefault.jpg"
        );
    }

    #[test]
    fn test_autoplay_url() {
        assert_eq!(
            autoplay_url("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1&rel=0"
        );
        assert_eq!(autoplay_url(""), "");
    }

    #[test]
    fn test_quality_parse_and_display() {
        assert_eq!(
            "maxresdefault".parse::<ThumbnailQuality>().unwrap(),
            ThumbnailQuality::MaxResDefault
        );
        assert_eq!(
            " SDDEFAULT ".parse::<ThumbnailQuality>().unwrap(),
            ThumbnailQuality::SdDefault
        );
        assert!("ultra".parse::<ThumbnailQuality>().is_err());
        assert_eq!(ThumbnailQuality::MqDefault.to_string(), "mqdefault");
    }

    #[test]
    fn test_quality_serde_names() {
        let json = serde_json::to_string(&ThumbnailQuality::MaxResDefault).unwrap();
        assert_eq!(json, "\"maxresdefault\"");
        let parsed: ThumbnailQuality = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(parsed, ThumbnailQuality::Default);
    }
}
