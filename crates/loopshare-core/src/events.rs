//! Change notifications emitted by the playlist store.
//!
//! Front ends subscribe to re-render after a mutation and to show a
//! notification when a remote call fails.

use serde::Serialize;

/// Capacity of the store's broadcast channel. Slow subscribers that fall
/// further behind miss events and should re-read the store.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Something changed in the store, or a remote call failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// The local playlist set was replaced by a fetch.
    PlaylistsLoaded {
        /// Number of playlists now known.
        count: usize,
    },
    /// A playlist was created and prepended.
    PlaylistCreated {
        /// New playlist id.
        playlist_id: String,
        /// Its name.
        name: String,
    },
    /// A video was appended to a playlist.
    VideoAdded {
        /// Target playlist.
        playlist_id: String,
        /// New video id.
        video_id: String,
    },
    /// A video was removed from a playlist.
    VideoRemoved {
        /// Playlist it was removed from.
        playlist_id: String,
        /// Removed video id.
        video_id: String,
    },
    /// A playlist's visibility flag flipped.
    VisibilityChanged {
        /// Playlist id.
        playlist_id: String,
        /// New value.
        is_public: bool,
    },
    /// The current playlist or video index changed.
    SelectionChanged {
        /// Selected playlist, if any.
        playlist_id: Option<String>,
        /// Current video index.
        video_index: usize,
    },
    /// The local set and selection were discarded.
    Cleared,
    /// A remote call failed; local state is unchanged.
    OperationFailed {
        /// Store operation that failed.
        operation: String,
        /// Human-readable reason.
        message: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = StoreEvent::VisibilityChanged {
            playlist_id: "p1".to_string(),
            is_public: true,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "visibility_changed");
        assert_eq!(value["is_public"], true);
    }

    #[test]
    fn test_failure_event_wire_format() {
        let event = StoreEvent::OperationFailed {
            operation: "add_video".to_string(),
            message: "Backend returned 500".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "operation_failed");
        assert_eq!(value["operation"], "add_video");
    }
}
