//! Playlist state store.
//!
//! [`PlaylistStore`] mirrors the signed-in user's playlists in memory and is
//! the only place they are mutated. Every mutation calls the repository
//! first and touches local state only after that call succeeds, so a failed
//! call leaves nothing half-applied.
//!
//! The current selection is kept as a playlist *id* plus a video index. The
//! current playlist is looked up in the canonical set on every read, so
//! there is no second copy to keep in sync.
//!
//! The store is a cheap handle: clone it and pass it to whatever needs it.
//! No lock is held while a repository call is in flight, so mutations from
//! different callers may complete in any order.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, error, info, warn};

use crate::auth::Session;
use crate::error::Result;
use crate::events::{EVENT_CHANNEL_CAPACITY, StoreEvent};
use crate::models::{NewPlaylist, NewVideo, Playlist, PlaylistSummary, Video, normalize_title};
use crate::repository::PlaylistRepository;
use crate::resolver::{self, ThumbnailQuality};

/// Which playlist and video are being viewed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Selected playlist id, if any.
    pub playlist_id: Option<String>,
    /// Index into the selected playlist's videos.
    pub video_index: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    playlists: Vec<Playlist>,
    selection: Selection,
}

impl StoreState {
    fn playlist(&self, id: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == id)
    }

    fn playlist_mut(&mut self, id: &str) -> Option<&mut Playlist> {
        self.playlists.iter_mut().find(|p| p.id == id)
    }

    fn current_playlist(&self) -> Option<&Playlist> {
        self.selection
            .playlist_id
            .as_deref()
            .and_then(|id| self.playlist(id))
    }
}

struct Inner {
    repository: Arc<dyn PlaylistRepository>,
    session: Arc<dyn Session>,
    thumbnail_quality: ThumbnailQuality,
    state: RwLock<StoreState>,
    events: broadcast::Sender<StoreEvent>,
}

/// Shared handle to the playlist state.
#[derive(Clone)]
pub struct PlaylistStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PlaylistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistStore")
            .field("thumbnail_quality", &self.inner.thumbnail_quality)
            .finish_non_exhaustive()
    }
}

impl PlaylistStore {
    /// Create an empty store over `repository` for the user `session` reports.
    #[must_use]
    pub fn new(repository: Arc<dyn PlaylistRepository>, session: Arc<dyn Session>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                repository,
                session,
                thumbnail_quality: ThumbnailQuality::default(),
                state: RwLock::new(StoreState::default()),
                events,
            }),
        }
    }

    /// Use `quality` for thumbnails of videos added from now on.
    ///
    /// Must be called before the handle is cloned.
    #[must_use]
    pub fn with_thumbnail_quality(self, quality: ThumbnailQuality) -> Self {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.thumbnail_quality = quality;
                Self {
                    inner: Arc::new(inner),
                }
            }
            Err(inner) => {
                warn!("Thumbnail quality ignored: store handle already shared");
                Self { inner }
            }
        }
    }

    /// Receive change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // Nobody listening is fine.
        let _ = self.inner.events.send(event);
    }

    /// Await a repository call, turning a failure into a notification.
    async fn remote<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match call.await {
            Ok(value) => Ok(value),
            Err(e) => {
                error!("{} failed [kind={:?}]: {}", operation, e.kind(), e);
                self.emit(StoreEvent::OperationFailed {
                    operation: operation.to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Replace the local set with the signed-in user's playlists.
    ///
    /// Without a signed-in user the previous user's state is discarded and
    /// nothing is fetched. Otherwise the selection is left as is.
    /// Returns the number of playlists loaded.
    pub async fn load_playlists(&self) -> Result<usize> {
        let Some(user) = self.inner.session.current_user() else {
            debug!("No signed-in user, skipping playlist load");
            let stale = {
                let state = self.inner.state.read().await;
                !state.playlists.is_empty() || state.selection != Selection::default()
            };
            if stale {
                self.clear().await;
            }
            return Ok(0);
        };

        let playlists = self
            .remote(
                "load_playlists",
                self.inner.repository.list_user_playlists(&user.id),
            )
            .await?;
        let count = playlists.len();

        self.inner.state.write().await.playlists = playlists;
        info!("Loaded {} playlists for {}", count, user.email);
        self.emit(StoreEvent::PlaylistsLoaded { count });
        Ok(count)
    }

    /// Public playlists of every owner, newest first.
    ///
    /// Does not touch the local set.
    pub async fn load_public_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        let playlists = self
            .remote(
                "load_public_playlists",
                self.inner.repository.list_public_playlists(),
            )
            .await?;
        debug!("Fetched {} public playlists", playlists.len());
        Ok(playlists.iter().map(Playlist::summary).collect())
    }

    /// Create a private, empty playlist and prepend it to the local set.
    ///
    /// A blank name or a missing user is a no-op returning `None`.
    pub async fn create_playlist(&self, name: &str) -> Result<Option<Playlist>> {
        let name = name.trim();
        if name.is_empty() {
            warn!("Ignoring playlist with blank name");
            return Ok(None);
        }
        let Some(user) = self.inner.session.current_user() else {
            warn!("Cannot create playlist '{}' without a signed-in user", name);
            return Ok(None);
        };

        let playlist = self
            .remote(
                "create_playlist",
                self.inner.repository.insert_playlist(NewPlaylist {
                    name: name.to_string(),
                    owner_id: user.id,
                    is_public: false,
                }),
            )
            .await?;

        self.inner
            .state
            .write()
            .await
            .playlists
            .insert(0, playlist.clone());
        info!("Created playlist '{}' ({})", playlist.name, playlist.id);
        self.emit(StoreEvent::PlaylistCreated {
            playlist_id: playlist.id.clone(),
            name: playlist.name.clone(),
        });
        Ok(Some(playlist))
    }

    /// Append the video at `raw_url` to a playlist.
    ///
    /// Returns `None` without calling the repository when no video id can
    /// be extracted from `raw_url` or the playlist is unknown. A blank
    /// title becomes "Untitled Video".
    pub async fn add_video(
        &self,
        playlist_id: &str,
        raw_url: &str,
        title: Option<&str>,
    ) -> Result<Option<Video>> {
        let Some(resolved) = resolver::resolve(raw_url, self.inner.thumbnail_quality) else {
            warn!("Ignoring unrecognized video URL: {}", raw_url);
            return Ok(None);
        };
        if self.inner.state.read().await.playlist(playlist_id).is_none() {
            warn!("Cannot add video to unknown playlist {}", playlist_id);
            return Ok(None);
        }

        let position = self
            .remote(
                "add_video",
                self.inner.repository.next_position(playlist_id),
            )
            .await?;
        let video = self
            .remote(
                "add_video",
                self.inner.repository.insert_video(NewVideo {
                    playlist_id: playlist_id.to_string(),
                    title: normalize_title(title),
                    embed_url: resolved.embed_url,
                    thumbnail_url: resolved.thumbnail_url,
                    source_url: raw_url.to_string(),
                    position,
                }),
            )
            .await?;

        let mut state = self.inner.state.write().await;
        if let Some(playlist) = state.playlist_mut(playlist_id) {
            playlist.videos.push(video.clone());
        } else {
            debug!(
                "Playlist {} left the local set while adding {}",
                playlist_id, video.id
            );
        }
        drop(state);

        info!(
            "Added video {} ({}) to {} at position {}",
            video.id, resolved.video_id, playlist_id, video.position
        );
        self.emit(StoreEvent::VideoAdded {
            playlist_id: playlist_id.to_string(),
            video_id: video.id.clone(),
        });
        Ok(Some(video))
    }

    /// Delete a video and drop it from its playlist.
    ///
    /// When the playlist is the selected one, the video index is clamped to
    /// the shortened list. Returns whether a local video was removed;
    /// unknown playlists are a no-op.
    pub async fn remove_video(&self, playlist_id: &str, video_id: &str) -> Result<bool> {
        if self.inner.state.read().await.playlist(playlist_id).is_none() {
            warn!("Cannot remove video from unknown playlist {}", playlist_id);
            return Ok(false);
        }

        self.remote(
            "remove_video",
            self.inner.repository.delete_video(video_id),
        )
        .await?;

        let mut state = self.inner.state.write().await;
        let Some(playlist) = state.playlist_mut(playlist_id) else {
            return Ok(false);
        };
        let before = playlist.videos.len();
        playlist.videos.retain(|v| v.id != video_id);
        let remaining = playlist.videos.len();
        let removed = remaining < before;

        let mut selection_changed = None;
        if state.selection.playlist_id.as_deref() == Some(playlist_id) {
            let clamped = state.selection.video_index.min(remaining.saturating_sub(1));
            if clamped != state.selection.video_index {
                state.selection.video_index = clamped;
                selection_changed = Some(state.selection.clone());
            }
        }
        drop(state);

        if removed {
            info!("Removed video {} from {}", video_id, playlist_id);
            self.emit(StoreEvent::VideoRemoved {
                playlist_id: playlist_id.to_string(),
                video_id: video_id.to_string(),
            });
        }
        if let Some(selection) = selection_changed {
            self.emit(StoreEvent::SelectionChanged {
                playlist_id: selection.playlist_id,
                video_index: selection.video_index,
            });
        }
        Ok(removed)
    }

    /// Flip a playlist between public and private.
    ///
    /// Only the owner may change it. Returns the new value, or `None` when the
    /// playlist is unknown or owned by someone else.
    pub async fn toggle_visibility(&self, playlist_id: &str) -> Result<Option<bool>> {
        let user = self.inner.session.current_user();
        let Some(current) = self
            .inner
            .state
            .read()
            .await
            .playlist(playlist_id)
            .filter(|p| p.is_owned_by(user.as_ref()))
            .map(|p| p.is_public)
        else {
            warn!(
                "Cannot toggle visibility of playlist {}: unknown or not owned",
                playlist_id
            );
            return Ok(None);
        };
        let is_public = !current;

        self.remote(
            "toggle_visibility",
            self.inner.repository.set_visibility(playlist_id, is_public),
        )
        .await?;

        if let Some(playlist) = self.inner.state.write().await.playlist_mut(playlist_id) {
            playlist.is_public = is_public;
        }
        info!(
            "Playlist {} is now {}",
            playlist_id,
            if is_public { "public" } else { "private" }
        );
        self.emit(StoreEvent::VisibilityChanged {
            playlist_id: playlist_id.to_string(),
            is_public,
        });
        Ok(Some(is_public))
    }

    /// Select a playlist and rewind to its first video.
    ///
    /// An unknown id clears the selection. Returns whether the id resolved.
    pub async fn select_playlist(&self, playlist_id: &str) -> bool {
        let mut state = self.inner.state.write().await;
        let found = state.playlist(playlist_id).is_some();
        state.selection = Selection {
            playlist_id: found.then(|| playlist_id.to_string()),
            video_index: 0,
        };
        let selection = state.selection.clone();
        drop(state);

        debug!("Selected playlist {:?}", selection.playlist_id);
        self.emit(StoreEvent::SelectionChanged {
            playlist_id: selection.playlist_id,
            video_index: 0,
        });
        found
    }

    /// Set the current video index.
    ///
    /// Not bounds-checked; navigation controls refuse out-of-range moves
    /// through [`can_go_next`](Self::can_go_next) and
    /// [`can_go_previous`](Self::can_go_previous).
    pub async fn select_video_index(&self, index: usize) {
        let mut state = self.inner.state.write().await;
        state.selection.video_index = index;
        let playlist_id = state.selection.playlist_id.clone();
        drop(state);

        self.emit(StoreEvent::SelectionChanged {
            playlist_id,
            video_index: index,
        });
    }

    /// Whether there is a video after the current one.
    pub async fn can_go_next(&self) -> bool {
        let state = self.inner.state.read().await;
        state
            .current_playlist()
            .is_some_and(|p| state.selection.video_index + 1 < p.videos.len())
    }

    /// Whether there is a video before the current one.
    pub async fn can_go_previous(&self) -> bool {
        self.inner.state.read().await.selection.video_index > 0
    }

    /// Move to the next video. Returns `false` at the end of the playlist.
    pub async fn next_video(&self) -> bool {
        if !self.can_go_next().await {
            return false;
        }
        let index = self.current_video_index().await + 1;
        self.select_video_index(index).await;
        true
    }

    /// Move to the previous video. Returns `false` at the first video.
    pub async fn previous_video(&self) -> bool {
        let index = self.current_video_index().await;
        if index == 0 {
            return false;
        }
        self.select_video_index(index - 1).await;
        true
    }

    /// Local lookup; never fetches.
    pub async fn lookup_playlist(&self, playlist_id: &str) -> Option<Playlist> {
        self.inner.state.read().await.playlist(playlist_id).cloned()
    }

    /// All known playlists, newest first.
    pub async fn playlists(&self) -> Vec<Playlist> {
        self.inner.state.read().await.playlists.clone()
    }

    /// The selected playlist as it is now in the canonical set.
    pub async fn current_playlist(&self) -> Option<Playlist> {
        self.inner.state.read().await.current_playlist().cloned()
    }

    /// Current video index.
    pub async fn current_video_index(&self) -> usize {
        self.inner.state.read().await.selection.video_index
    }

    /// Current selection.
    pub async fn selection(&self) -> Selection {
        self.inner.state.read().await.selection.clone()
    }

    /// The video at the current index of the selected playlist.
    pub async fn current_video(&self) -> Option<Video> {
        let state = self.inner.state.read().await;
        state
            .current_playlist()
            .and_then(|p| p.videos.get(state.selection.video_index))
            .cloned()
    }

    /// Link that opens `playlist_id` in the web front end at `origin`.
    pub async fn share_url(&self, origin: &str, playlist_id: &str) -> Option<String> {
        self.inner
            .state
            .read()
            .await
            .playlist(playlist_id)
            .map(|p| format!("{}/playlist/{}", origin.trim_end_matches('/'), p.id))
    }

    /// Discard the local set and the selection, e.g. on sign-out.
    pub async fn clear(&self) {
        *self.inner.state.write().await = StoreState::default();
        info!("Cleared playlist state");
        self.emit(StoreEvent::Cleared);
    }
}
