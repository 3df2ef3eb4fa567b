//! In-process repository.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::{PlaylistRepository, normalize_listing};
use crate::error::{RepositoryError, Result};
use crate::models::{NewPlaylist, NewVideo, Playlist, Video};

/// Everything a [`MemoryRepository`] holds, in a serializable form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// All playlists with their videos, most recently inserted first.
    pub playlists: Vec<Playlist>,
}

/// Repository that keeps everything in memory.
///
/// Ids are `playlist-<millis>-<seq>` / `video-<millis>-<seq>`: unique within
/// the process, not across processes.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    data: Mutex<Snapshot>,
    sequence: AtomicU64,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-filled with `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        // Continue past every existing row so reopened data never reuses an id.
        let rows: usize = snapshot
            .playlists
            .iter()
            .map(|p| 1 + p.videos.len())
            .sum();
        Self {
            data: Mutex::new(snapshot),
            sequence: AtomicU64::new(rows as u64),
        }
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> Snapshot {
        self.data.lock().await.clone()
    }

    /// Replace the contents with `snapshot`. The id sequence keeps counting.
    pub async fn restore(&self, snapshot: Snapshot) {
        *self.data.lock().await = snapshot;
    }

    fn placeholder_id(&self, prefix: &str) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{}-{seq}", Utc::now().timestamp_millis())
    }
}

#[async_trait]
impl PlaylistRepository for MemoryRepository {
    async fn list_user_playlists(&self, owner_id: &str) -> Result<Vec<Playlist>> {
        let data = self.data.lock().await;
        let mut playlists: Vec<Playlist> = data
            .playlists
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        normalize_listing(&mut playlists);
        Ok(playlists)
    }

    async fn list_public_playlists(&self) -> Result<Vec<Playlist>> {
        let data = self.data.lock().await;
        let mut playlists: Vec<Playlist> =
            data.playlists.iter().filter(|p| p.is_public).cloned().collect();
        normalize_listing(&mut playlists);
        Ok(playlists)
    }

    async fn insert_playlist(&self, playlist: NewPlaylist) -> Result<Playlist> {
        let row = Playlist {
            id: self.placeholder_id("playlist"),
            name: playlist.name,
            owner_id: playlist.owner_id,
            is_public: playlist.is_public,
            created_at: Utc::now(),
            videos: Vec::new(),
        };
        debug!("Inserting playlist {} ({})", row.id, row.name);
        self.data.lock().await.playlists.insert(0, row.clone());
        Ok(row)
    }

    async fn set_visibility(&self, playlist_id: &str, is_public: bool) -> Result<()> {
        let mut data = self.data.lock().await;
        let playlist = data
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "playlist",
                id: playlist_id.to_string(),
            })?;
        playlist.is_public = is_public;
        Ok(())
    }

    async fn next_position(&self, playlist_id: &str) -> Result<i64> {
        let data = self.data.lock().await;
        Ok(data
            .playlists
            .iter()
            .find(|p| p.id == playlist_id)
            .map_or(0, Playlist::next_position))
    }

    async fn insert_video(&self, video: NewVideo) -> Result<Video> {
        let id = self.placeholder_id("video");
        let mut data = self.data.lock().await;
        let playlist = data
            .playlists
            .iter_mut()
            .find(|p| p.id == video.playlist_id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "playlist",
                id: video.playlist_id.clone(),
            })?;
        let row = Video {
            id,
            playlist_id: video.playlist_id,
            source_url: video.source_url,
            embed_url: video.embed_url,
            thumbnail_url: video.thumbnail_url,
            title: video.title,
            position: video.position,
        };
        debug!("Inserting video {} into {}", row.id, playlist.id);
        playlist.videos.push(row.clone());
        Ok(row)
    }

    async fn delete_video(&self, video_id: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        for playlist in &mut data.playlists {
            playlist.videos.retain(|v| v.id != video_id);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn new_playlist(name: &str, owner: &str) -> NewPlaylist {
        NewPlaylist {
            name: name.to_string(),
            owner_id: owner.to_string(),
            is_public: false,
        }
    }

    fn new_video(playlist_id: &str, position: i64) -> NewVideo {
        NewVideo {
            playlist_id: playlist_id.to_string(),
            title: format!("Video {position}"),
            embed_url: "https://www.youtube.com/embed/dQw4w9WgXcQ".to_string(),
            thumbnail_url: "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
            source_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            position,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_unique_ids() {
        let repo = MemoryRepository::new();
        let a = repo.insert_playlist(new_playlist("A", "u1")).await.unwrap();
        let b = repo.insert_playlist(new_playlist("B", "u1")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("playlist-"));
        assert!(!a.is_public);
        assert!(a.videos.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_newest_first() {
        let repo = MemoryRepository::new();
        repo.insert_playlist(new_playlist("Old", "u1")).await.unwrap();
        repo.insert_playlist(new_playlist("Other", "u2")).await.unwrap();
        repo.insert_playlist(new_playlist("New", "u1")).await.unwrap();

        let names: Vec<String> = repo
            .list_user_playlists("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["New".to_string(), "Old".to_string()]);
    }

    #[tokio::test]
    async fn test_public_listing() {
        let repo = MemoryRepository::new();
        let a = repo.insert_playlist(new_playlist("A", "u1")).await.unwrap();
        repo.insert_playlist(new_playlist("B", "u2")).await.unwrap();
        repo.set_visibility(&a.id, true).await.unwrap();

        let public = repo.list_public_playlists().await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, a.id);
    }

    #[tokio::test]
    async fn test_set_visibility_unknown_playlist() {
        let repo = MemoryRepository::new();
        let err = repo.set_visibility("missing", true).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Repository(RepositoryError::NotFound { entity: "playlist", .. })
        ));
    }

    #[tokio::test]
    async fn test_positions_and_delete() {
        let repo = MemoryRepository::new();
        let p = repo.insert_playlist(new_playlist("A", "u1")).await.unwrap();
        assert_eq!(repo.next_position(&p.id).await.unwrap(), 0);

        let first = repo.insert_video(new_video(&p.id, 0)).await.unwrap();
        repo.insert_video(new_video(&p.id, 1)).await.unwrap();
        assert_eq!(repo.next_position(&p.id).await.unwrap(), 2);
        assert_eq!(first.source_url, "https://youtu.be/dQw4w9WgXcQ");

        repo.delete_video(&first.id).await.unwrap();
        repo.delete_video("missing").await.unwrap();
        let listed = repo.list_user_playlists("u1").await.unwrap();
        assert_eq!(listed[0].videos.len(), 1);
        assert_eq!(listed[0].videos[0].position, 1);
    }

    #[tokio::test]
    async fn test_insert_video_unknown_playlist() {
        let repo = MemoryRepository::new();
        assert!(repo.insert_video(new_video("missing", 0)).await.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_preserves_contents() {
        let repo = MemoryRepository::new();
        let p = repo.insert_playlist(new_playlist("A", "u1")).await.unwrap();
        repo.insert_video(new_video(&p.id, 0)).await.unwrap();

        let restored = MemoryRepository::from_snapshot(repo.snapshot().await);
        assert_eq!(restored.snapshot().await, repo.snapshot().await);
    }
}
