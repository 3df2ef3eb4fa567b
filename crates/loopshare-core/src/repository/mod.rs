//! Persistence collaborator.
//!
//! The store never talks to a database directly. It goes through
//! [`PlaylistRepository`], which has three implementations:
//!
//! - [`MemoryRepository`]: process-local, ids are timestamp placeholders
//! - [`FileRepository`]: the memory repository persisted to a JSON file, for
//!   offline use
//! - [`RestRepository`]: the hosted relational store over its REST interface

mod file;
mod memory;
mod rest;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewPlaylist, NewVideo, Playlist, Video};

pub use file::FileRepository;
pub use memory::{MemoryRepository, Snapshot};
pub use rest::{RestConfig, RestRepository};

/// Storage for playlists and their videos.
///
/// Implementations own id assignment. Listing methods return playlists
/// newest first, each with its videos sorted by position.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    /// Playlists owned by `owner_id`, with videos.
    async fn list_user_playlists(&self, owner_id: &str) -> Result<Vec<Playlist>>;

    /// Public playlists of every owner, with videos.
    async fn list_public_playlists(&self) -> Result<Vec<Playlist>>;

    /// Insert a playlist and return the stored row.
    async fn insert_playlist(&self, playlist: NewPlaylist) -> Result<Playlist>;

    /// Set the visibility flag of a playlist.
    async fn set_visibility(&self, playlist_id: &str, is_public: bool) -> Result<()>;

    /// One past the highest position used in `playlist_id`, 0 when empty.
    ///
    /// This is a read followed by a separate insert, so two concurrent
    /// writers can obtain the same value. Backends that need strict
    /// ordering should assign positions with a sequence instead.
    async fn next_position(&self, playlist_id: &str) -> Result<i64>;

    /// Insert a video and return the stored row.
    async fn insert_video(&self, video: NewVideo) -> Result<Video>;

    /// Delete a video by id. Deleting a missing id is not an error.
    async fn delete_video(&self, video_id: &str) -> Result<()>;
}

/// Order playlists newest first and their videos by position.
pub(crate) fn normalize_listing(playlists: &mut [Playlist]) {
    playlists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    for playlist in playlists.iter_mut() {
        playlist.sort_videos();
    }
}
