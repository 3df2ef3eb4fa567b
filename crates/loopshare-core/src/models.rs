//! Playlist, video and user records.
//!
//! Field names on the wire follow the backend tables (`playlists`,
//! `playlist_videos`), so the same types decode rows from the hosted store
//! and from the offline data file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title stored when the user leaves the title blank.
pub const UNTITLED_VIDEO: &str = "Untitled Video";

/// Longest prefix of a title shown in previews before it is cut.
pub const TITLE_PREVIEW_CHARS: usize = 20;

/// A signed-in user, as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account identifier.
    pub id: String,
    /// Account e-mail.
    pub email: String,
}

/// One video entry of a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Row identifier.
    pub id: String,
    /// Owning playlist.
    pub playlist_id: String,
    /// What the user pasted. Older rows only carry the embed form.
    #[serde(default)]
    pub source_url: String,
    /// Embeddable player URL.
    #[serde(rename = "url")]
    pub embed_url: String,
    /// Preview image URL.
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    /// Display title.
    pub title: String,
    /// Ordering key within the playlist.
    pub position: i64,
}

/// A playlist and its videos in playback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Row identifier.
    pub id: String,
    /// Display name, never blank.
    pub name: String,
    /// Owning user.
    #[serde(rename = "user_id")]
    pub owner_id: String,
    /// Whether other users can browse it.
    #[serde(default)]
    pub is_public: bool,
    /// Creation time, newest playlists are listed first.
    pub created_at: DateTime<Utc>,
    /// Videos ordered by position.
    #[serde(rename = "playlist_videos", default)]
    pub videos: Vec<Video>,
}

impl Playlist {
    /// Highest position in use, if any.
    #[must_use]
    pub fn max_position(&self) -> Option<i64> {
        self.videos.iter().map(|v| v.position).max()
    }

    /// Position the next appended video should take.
    #[must_use]
    pub fn next_position(&self) -> i64 {
        self.max_position().map_or(0, |p| p + 1)
    }

    /// Whether `user` owns this playlist.
    #[must_use]
    pub fn is_owned_by(&self, user: Option<&User>) -> bool {
        user.is_some_and(|u| u.id == self.owner_id)
    }

    /// Short preview of the most recently appended video's title.
    #[must_use]
    pub fn latest_title_preview(&self) -> Option<String> {
        self.videos.last().map(|v| truncate_title(&v.title))
    }

    /// Sort videos by position, keeping insertion order on ties.
    pub fn sort_videos(&mut self) {
        self.videos.sort_by_key(|v| v.position);
    }

    /// Lightweight view for listings.
    #[must_use]
    pub fn summary(&self) -> PlaylistSummary {
        PlaylistSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            owner_id: self.owner_id.clone(),
            is_public: self.is_public,
            video_count: self.videos.len(),
        }
    }
}

/// What a playlist card shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    /// Playlist identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owning user.
    pub owner_id: String,
    /// Visibility flag.
    pub is_public: bool,
    /// Number of videos.
    pub video_count: usize,
}

impl PlaylistSummary {
    /// "1 video" or "N videos".
    #[must_use]
    pub fn video_count_label(&self) -> String {
        if self.video_count == 1 {
            "1 video".to_string()
        } else {
            format!("{} videos", self.video_count)
        }
    }

    /// "Public" or "Private".
    #[must_use]
    pub const fn visibility_label(&self) -> &'static str {
        if self.is_public { "Public" } else { "Private" }
    }

    /// Whether `user` owns the playlist, which gates the visibility toggle.
    #[must_use]
    pub fn is_owned_by(&self, user: Option<&User>) -> bool {
        user.is_some_and(|u| u.id == self.owner_id)
    }
}

/// Insert payload for a playlist row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPlaylist {
    /// Display name, already trimmed.
    pub name: String,
    /// Owning user.
    #[serde(rename = "user_id")]
    pub owner_id: String,
    /// Visibility flag; new playlists are private.
    pub is_public: bool,
}

/// Insert payload for a video row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewVideo {
    /// Owning playlist.
    pub playlist_id: String,
    /// Display title, placeholder already applied.
    pub title: String,
    /// Embeddable player URL.
    #[serde(rename = "url")]
    pub embed_url: String,
    /// Preview image URL.
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    /// What the user pasted. Not a backend column.
    #[serde(skip)]
    pub source_url: String,
    /// Ordering key.
    pub position: i64,
}

/// Title to store for user input `title`.
#[must_use]
pub fn normalize_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => UNTITLED_VIDEO.to_string(),
    }
}

/// Cut `title` to [`TITLE_PREVIEW_CHARS`] characters, adding "..." when cut.
#[must_use]
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > TITLE_PREVIEW_CHARS {
        let head: String = title.chars().take(TITLE_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn video(id: &str, position: i64, title: &str) -> Video {
        Video {
            id: id.to_string(),
            playlist_id: "p1".to_string(),
            source_url: String::new(),
            embed_url: "https://www.youtube.com/embed/dQw4w9WgXcQ".to_string(),
            thumbnail_url: "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
            title: title.to_string(),
            position,
        }
    }

    fn playlist(videos: Vec<Video>) -> Playlist {
        Playlist {
            id: "p1".to_string(),
            name: "Music Videos".to_string(),
            owner_id: "user-1".to_string(),
            is_public: false,
            created_at: Utc::now(),
            videos,
        }
    }

    #[test]
    fn test_next_position() {
        assert_eq!(playlist(vec![]).next_position(), 0);
        let p = playlist(vec![video("a", 0, "A"), video("b", 4, "B"), video("c", 2, "C")]);
        assert_eq!(p.next_position(), 5);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title(None), UNTITLED_VIDEO);
        assert_eq!(normalize_title(Some("   ")), UNTITLED_VIDEO);
        assert_eq!(normalize_title(Some(" Intro ")), "Intro");
    }

    #[test]
    fn test_latest_title_preview() {
        let p = playlist(vec![
            video("a", 0, "Short"),
            video("b", 1, "Rick Astley - Never Gonna Give You Up"),
        ]);
        assert_eq!(
            p.latest_title_preview().as_deref(),
            Some("Rick Astley - Never ...")
        );
        assert_eq!(playlist(vec![]).latest_title_preview(), None);
        assert_eq!(truncate_title("Exactly twenty chars"), "Exactly twenty chars");
    }

    #[test]
    fn test_summary_labels() {
        let mut p = playlist(vec![video("a", 0, "A")]);
        let summary = p.summary();
        assert_eq!(summary.video_count_label(), "1 video");
        assert_eq!(summary.visibility_label(), "Private");

        p.videos.push(video("b", 1, "B"));
        p.is_public = true;
        let summary = p.summary();
        assert_eq!(summary.video_count_label(), "2 videos");
        assert_eq!(summary.visibility_label(), "Public");
    }

    #[test]
    fn test_ownership() {
        let p = playlist(vec![]);
        let owner = User {
            id: "user-1".to_string(),
            email: "owner@example.com".to_string(),
        };
        let other = User {
            id: "user-2".to_string(),
            email: "other@example.com".to_string(),
        };
        assert!(p.is_owned_by(Some(&owner)));
        assert!(!p.is_owned_by(Some(&other)));
        assert!(!p.summary().is_owned_by(None));
    }

    #[test]
    fn test_playlist_decodes_backend_row() {
        let json = r#"{
            "id": "8d6c",
            "name": "Tech Tutorials",
            "user_id": "user-1",
            "is_public": true,
            "created_at": "2024-05-01T10:00:00+00:00",
            "playlist_videos": [
                {
                    "id": "v1",
                    "playlist_id": "8d6c",
                    "title": "JavaScript Crash Course",
                    "url": "https://www.youtube.com/embed/eIrMbAQSU34",
                    "thumbnail": "https://img.youtube.com/vi/eIrMbAQSU34/hqdefault.jpg",
                    "position": 0
                }
            ]
        }"#;
        let p: Playlist = serde_json::from_str(json).unwrap();
        assert_eq!(p.owner_id, "user-1");
        assert!(p.is_public);
        assert_eq!(p.videos.len(), 1);
        assert_eq!(p.videos[0].embed_url, "https://www.youtube.com/embed/eIrMbAQSU34");
        assert_eq!(p.videos[0].source_url, "");
    }

    #[test]
    fn test_new_video_wire_format() {
        let row = NewVideo {
            playlist_id: "p1".to_string(),
            title: "Intro".to_string(),
            embed_url: "https://www.youtube.com/embed/dQw4w9WgXcQ".to_string(),
            thumbnail_url: "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
            source_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            position: 3,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["url"], "https://www.youtube.com/embed/dQw4w9WgXcQ");
        assert_eq!(value["position"], 3);
        assert!(value.get("source_url").is_none());
    }
}
