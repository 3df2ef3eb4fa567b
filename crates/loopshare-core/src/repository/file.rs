//! Offline repository persisted to a JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{MemoryRepository, PlaylistRepository, Snapshot};
use crate::error::{RepositoryError, Result};
use crate::models::{NewPlaylist, NewVideo, Playlist, Video};

/// [`MemoryRepository`] whose contents are written to disk after every
/// mutation.
#[derive(Debug)]
pub struct FileRepository {
    path: PathBuf,
    memory: MemoryRepository,
    write_lock: Mutex<()>,
}

fn data_file_error(path: &Path, e: impl ToString) -> RepositoryError {
    RepositoryError::DataFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

impl FileRepository {
    /// Open the data file at `path`. A missing file starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let snapshot: Snapshot =
                    serde_json::from_str(&content).map_err(|e| data_file_error(&path, e))?;
                info!(
                    "Loaded {} playlists from {}",
                    snapshot.playlists.len(),
                    path.display()
                );
                snapshot
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Data file {} not found, starting empty", path.display());
                Snapshot::default()
            }
            Err(e) => return Err(data_file_error(&path, e).into()),
        };

        Ok(Self {
            path,
            memory: MemoryRepository::from_snapshot(snapshot),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the data file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| data_file_error(parent, e))?;
        }
        let content = serde_json::to_string_pretty(&self.memory.snapshot().await)?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| data_file_error(&self.path, e))?;
        debug!("Saved data file {}", self.path.display());
        Ok(())
    }

    /// Write the mutated contents, or put `before` back if the write fails.
    async fn commit<T>(&self, before: Snapshot, value: T) -> Result<T> {
        match self.persist().await {
            Ok(()) => Ok(value),
            Err(e) => {
                warn!("Rolling back unsaved change: {}", e);
                self.memory.restore(before).await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl PlaylistRepository for FileRepository {
    async fn list_user_playlists(&self, owner_id: &str) -> Result<Vec<Playlist>> {
        self.memory.list_user_playlists(owner_id).await
    }

    async fn list_public_playlists(&self) -> Result<Vec<Playlist>> {
        self.memory.list_public_playlists().await
    }

    async fn insert_playlist(&self, playlist: NewPlaylist) -> Result<Playlist> {
        let _guard = self.write_lock.lock().await;
        let before = self.memory.snapshot().await;
        let row = self.memory.insert_playlist(playlist).await?;
        self.commit(before, row).await
    }

    async fn set_visibility(&self, playlist_id: &str, is_public: bool) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let before = self.memory.snapshot().await;
        self.memory.set_visibility(playlist_id, is_public).await?;
        self.commit(before, ()).await
    }

    async fn next_position(&self, playlist_id: &str) -> Result<i64> {
        self.memory.next_position(playlist_id).await
    }

    async fn insert_video(&self, video: NewVideo) -> Result<Video> {
        let _guard = self.write_lock.lock().await;
        let before = self.memory.snapshot().await;
        let row = self.memory.insert_video(video).await?;
        self.commit(before, row).await
    }

    async fn delete_video(&self, video_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let before = self.memory.snapshot().await;
        self.memory.delete_video(video_id).await?;
        self.commit(before, ()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let repo = FileRepository::open(dir.path().join("playlists.json"))
            .await
            .unwrap();
        assert!(repo.list_user_playlists("u1").await.unwrap().is_empty());
        assert!(!repo.path().exists());
    }

    #[tokio::test]
    async fn test_mutations_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("playlists.json");

        let repo = FileRepository::open(&path).await.unwrap();
        let playlist = repo
            .insert_playlist(NewPlaylist {
                name: "Road trip".to_string(),
                owner_id: "u1".to_string(),
                is_public: false,
            })
            .await
            .unwrap();
        repo.insert_video(NewVideo {
            playlist_id: playlist.id.clone(),
            title: "Intro".to_string(),
            embed_url: "https://www.youtube.com/embed/dQw4w9WgXcQ".to_string(),
            thumbnail_url: "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
            source_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            position: 0,
        })
        .await
        .unwrap();
        repo.set_visibility(&playlist.id, true).await.unwrap();
        drop(repo);

        let reopened = FileRepository::open(&path).await.unwrap();
        let playlists = reopened.list_public_playlists().await.unwrap();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].name, "Road trip");
        assert_eq!(playlists[0].videos.len(), 1);
        assert_eq!(playlists[0].videos[0].source_url, "https://youtu.be/dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let dir = TempDir::new().unwrap();
        let blocked = dir.path().join("sub");
        let repo = FileRepository::open(blocked.join("playlists.json"))
            .await
            .unwrap();
        let kept = NewPlaylist {
            name: "Kept".to_string(),
            owner_id: "u1".to_string(),
            is_public: false,
        };

        // A regular file where the data directory should be.
        std::fs::write(&blocked, "not a directory").unwrap();
        let err = repo
            .insert_playlist(NewPlaylist {
                name: "Ghost".to_string(),
                ..kept.clone()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Repository(RepositoryError::DataFile { .. })
        ));
        assert!(repo.list_user_playlists("u1").await.unwrap().is_empty());

        // Later successful writes do not resurrect the failed row.
        std::fs::remove_file(&blocked).unwrap();
        let playlist = repo.insert_playlist(kept).await.unwrap();
        assert!(repo.set_visibility(&playlist.id, true).await.is_ok());
        std::fs::remove_dir_all(&blocked).unwrap();
        std::fs::write(&blocked, "not a directory").unwrap();
        assert!(repo.set_visibility(&playlist.id, false).await.is_err());
        std::fs::remove_file(&blocked).unwrap();

        let names: Vec<String> = repo
            .list_user_playlists("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Kept".to_string()]);
        assert_eq!(repo.list_public_playlists().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("playlists.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = FileRepository::open(&path).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Repository(RepositoryError::DataFile { .. })
        ));
    }
}
