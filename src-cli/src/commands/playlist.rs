//! Playlist management commands.

use std::fmt::Write as _;

use loopshare_core::resolver::{self, ThumbnailQuality};
use loopshare_core::{Playlist, PlaylistSummary, Session, Video};
use tracing::{debug, info};

use super::error::{CommandError, CommandResult, map_err};
use super::state::AppState;

const NOT_SIGNED_IN: &str = "Not signed in; add a \"user\" section to the config";

/// Fetch the signed-in user's playlists and find `key` by id, then by name.
async fn find_playlist(state: &AppState, key: &str) -> Result<Playlist, CommandError> {
    if state.session.current_user().is_none() {
        return Err(CommandError::rejected(NOT_SIGNED_IN));
    }
    state.store.load_playlists().await.map_err(map_err)?;

    if let Some(playlist) = state.store.lookup_playlist(key).await {
        return Ok(playlist);
    }
    state
        .store
        .playlists()
        .await
        .into_iter()
        .find(|p| p.name == key)
        .ok_or_else(|| CommandError::rejected(format!("Unknown playlist: {key}")))
}

/// Find a video by id or by its 1-based place in the playlist.
fn find_video<'a>(playlist: &'a Playlist, key: &str) -> Option<&'a Video> {
    playlist.videos.iter().find(|v| v.id == key).or_else(|| {
        key.parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| playlist.videos.get(i))
    })
}

fn summary_line(summary: &PlaylistSummary) -> String {
    format!(
        "{}  [{}, {}]  id={}",
        summary.name,
        summary.video_count_label(),
        summary.visibility_label(),
        summary.id
    )
}

/// Show what a pasted link resolves to.
pub fn resolve(url: &str, quality: ThumbnailQuality) -> CommandResult {
    let resolved = resolver::resolve(url, quality)
        .ok_or_else(|| CommandError::rejected(format!("Not a recognized video link: {url}")))?;
    debug!("Resolved {} to {}", url, resolved.video_id);

    let mut out = String::new();
    let _ = writeln!(out, "Video id:  {}", resolved.video_id);
    let _ = writeln!(out, "Embed:     {}", resolved.embed_url);
    let _ = writeln!(out, "Autoplay:  {}", resolver::autoplay_url(&resolved.embed_url));
    let _ = write!(out, "Thumbnail: {}", resolved.thumbnail_url);
    Ok(out)
}

/// List the signed-in user's playlists.
pub async fn list(state: &AppState) -> CommandResult {
    let Some(user) = state.session.current_user() else {
        return Err(CommandError::rejected(NOT_SIGNED_IN));
    };
    state.store.load_playlists().await.map_err(map_err)?;
    let playlists = state.store.playlists().await;
    if playlists.is_empty() {
        return Ok(format!("No playlists yet for {}", user.email));
    }

    let mut out = String::new();
    for (i, playlist) in playlists.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&summary_line(&playlist.summary()));
        if let Some(preview) = playlist.latest_title_preview() {
            let _ = write!(out, "\n    latest: {preview}");
        }
    }
    Ok(out)
}

/// List every public playlist.
pub async fn explore(state: &AppState) -> CommandResult {
    let playlists = state.store.load_public_playlists().await.map_err(map_err)?;
    if playlists.is_empty() {
        return Ok("No public playlists".to_string());
    }

    let user = state.session.current_user();
    let lines: Vec<String> = playlists
        .iter()
        .map(|summary| {
            let mine = if summary.is_owned_by(user.as_ref()) {
                "  (yours)"
            } else {
                ""
            };
            format!("{}{mine}", summary_line(summary))
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Create a private playlist.
pub async fn create(state: &AppState, name: &str) -> CommandResult {
    if state.session.current_user().is_none() {
        return Err(CommandError::rejected(NOT_SIGNED_IN));
    }
    let playlist = state
        .store
        .create_playlist(name)
        .await
        .map_err(map_err)?
        .ok_or_else(|| CommandError::rejected("Playlist name must not be blank"))?;
    info!("Created playlist {} from the command line", playlist.id);
    Ok(format!("Created playlist '{}' (id={})", playlist.name, playlist.id))
}

/// Append a video to a playlist.
pub async fn add(state: &AppState, playlist: &str, url: &str, title: Option<&str>) -> CommandResult {
    let playlist = find_playlist(state, playlist).await?;
    let video = state
        .store
        .add_video(&playlist.id, url, title)
        .await
        .map_err(map_err)?
        .ok_or_else(|| CommandError::rejected(format!("Not a recognized video link: {url}")))?;
    Ok(format!(
        "Added '{}' to '{}' at position {} (id={})",
        video.title, playlist.name, video.position, video.id
    ))
}

/// Remove a video, given by id or 1-based place.
pub async fn remove(state: &AppState, playlist: &str, video: &str) -> CommandResult {
    let playlist = find_playlist(state, playlist).await?;
    let video = find_video(&playlist, video)
        .cloned()
        .ok_or_else(|| {
            CommandError::rejected(format!("No video {video} in '{}'", playlist.name))
        })?;
    state
        .store
        .remove_video(&playlist.id, &video.id)
        .await
        .map_err(map_err)?;
    Ok(format!("Removed '{}' from '{}'", video.title, playlist.name))
}

/// Flip a playlist between public and private.
pub async fn toggle(state: &AppState, playlist: &str) -> CommandResult {
    let playlist = find_playlist(state, playlist).await?;
    let is_public = state
        .store
        .toggle_visibility(&playlist.id)
        .await
        .map_err(map_err)?
        .ok_or_else(|| {
            CommandError::rejected(format!("Only the owner can change '{}'", playlist.name))
        })?;
    Ok(format!(
        "'{}' is now {}",
        playlist.name,
        if is_public { "public" } else { "private" }
    ))
}

/// Select a playlist and show the video at `position` (1-based).
pub async fn play(state: &AppState, playlist: &str, position: Option<usize>) -> CommandResult {
    let playlist = find_playlist(state, playlist).await?;
    if playlist.videos.is_empty() {
        return Err(CommandError::rejected(format!(
            "'{}' has no videos yet",
            playlist.name
        )));
    }
    state.store.select_playlist(&playlist.id).await;

    if let Some(position) = position {
        let index = position
            .checked_sub(1)
            .filter(|&i| i < playlist.videos.len())
            .ok_or_else(|| {
                CommandError::rejected(format!(
                    "'{}' has {} videos; pick a position from 1 to {}",
                    playlist.name,
                    playlist.videos.len(),
                    playlist.videos.len()
                ))
            })?;
        state.store.select_video_index(index).await;
    }

    let index = state.store.current_video_index().await;
    let video = state
        .store
        .current_video()
        .await
        .ok_or_else(|| CommandError::rejected("Nothing to play"))?;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Now playing [{}/{}] {}",
        index + 1,
        playlist.videos.len(),
        video.title
    );
    let _ = writeln!(out, "Watch:    {}", resolver::autoplay_url(&video.embed_url));
    let _ = writeln!(
        out,
        "Previous: {}",
        if state.store.can_go_previous().await { "available" } else { "-" }
    );
    let _ = write!(
        out,
        "Next:     {}",
        if state.store.can_go_next().await { "available" } else { "-" }
    );
    Ok(out)
}

/// Print the link that opens a playlist in the web front end.
pub async fn share(state: &AppState, playlist: &str) -> CommandResult {
    let playlist = find_playlist(state, playlist).await?;
    let url = state
        .store
        .share_url(&state.config.share_origin, &playlist.id)
        .await
        .ok_or_else(|| CommandError::rejected(format!("Unknown playlist: {}", playlist.id)))?;
    if playlist.is_public {
        Ok(url)
    } else {
        Ok(format!(
            "{url}\n(private: only you can open it; run `loopshare toggle` to make it public)"
        ))
    }
}
