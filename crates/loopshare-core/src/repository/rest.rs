//! Repository backed by the hosted relational store's REST interface.
//!
//! Tables:
//! - `playlists (id, name, user_id, is_public, created_at)`
//! - `playlist_videos (id, playlist_id, title, url, thumbnail, position)`
//!
//! Row-level access rules live in the backend; this client only issues
//! requests on behalf of the signed-in user.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::{PlaylistRepository, normalize_listing};
use crate::auth::Session;
use crate::error::{Error, RepositoryError, Result};
use crate::models::{NewPlaylist, NewVideo, Playlist, Video};

const PLAYLISTS_TABLE: &str = "playlists";
const VIDEOS_TABLE: &str = "playlist_videos";
const PLAYLIST_WITH_VIDEOS: &str = "*,playlist_videos(*)";

/// Connection settings for [`RestRepository`].
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub base_url: String,
    /// Public API key sent with every request.
    pub anon_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// [`PlaylistRepository`] over HTTP.
pub struct RestRepository {
    client: Client,
    config: RestConfig,
    session: Arc<dyn Session>,
}

#[derive(Deserialize)]
struct PositionRow {
    position: i64,
}

impl RestRepository {
    /// Create a client. The session supplies the bearer token; without one
    /// the anon key is used, which only sees public rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: RestConfig, session: Arc<dyn Session>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            session,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{table}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .access_token()
            .unwrap_or_else(|| self.config.anon_key.clone());
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| Error::request_failed(url, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(RepositoryError::Status {
                status: status.as_u16(),
                body,
            }
            .into())
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, url: &str, request: RequestBuilder) -> Result<T> {
        let response = self.send(url, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RepositoryError::Decode(e.to_string()).into())
    }

    async fn list_playlists(&self, filter: (&str, String)) -> Result<Vec<Playlist>> {
        let url = self.table_url(PLAYLISTS_TABLE);
        debug!("GET {} where {}={}", url, filter.0, filter.1);
        let request = self.client.get(&url).query(&[
            ("select", PLAYLIST_WITH_VIDEOS.to_string()),
            (filter.0, filter.1),
            ("order", "created_at.desc".to_string()),
            ("playlist_videos.order", "position.asc".to_string()),
        ]);
        let mut playlists: Vec<Playlist> = self.send_json(&url, request).await?;
        normalize_listing(&mut playlists);
        Ok(playlists)
    }

    async fn insert_row<B, T>(&self, table: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.table_url(table);
        debug!("POST {}", url);
        let request = self
            .client
            .post(&url)
            .header("Prefer", "return=representation")
            .json(&[body]);
        let rows: Vec<T> = self.send_json(&url, request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepositoryError::Decode(format!("insert into {table} returned no row")).into())
    }
}

#[async_trait]
impl PlaylistRepository for RestRepository {
    async fn list_user_playlists(&self, owner_id: &str) -> Result<Vec<Playlist>> {
        self.list_playlists(("user_id", format!("eq.{owner_id}"))).await
    }

    async fn list_public_playlists(&self) -> Result<Vec<Playlist>> {
        self.list_playlists(("is_public", "eq.true".to_string())).await
    }

    async fn insert_playlist(&self, playlist: NewPlaylist) -> Result<Playlist> {
        self.insert_row(PLAYLISTS_TABLE, &playlist).await
    }

    async fn set_visibility(&self, playlist_id: &str, is_public: bool) -> Result<()> {
        let url = self.table_url(PLAYLISTS_TABLE);
        debug!("PATCH {} id={} is_public={}", url, playlist_id, is_public);
        let request = self
            .client
            .patch(&url)
            .query(&[("id", format!("eq.{playlist_id}"))])
            .json(&json!({ "is_public": is_public }));
        self.send(&url, request).await?;
        Ok(())
    }

    async fn next_position(&self, playlist_id: &str) -> Result<i64> {
        let url = self.table_url(VIDEOS_TABLE);
        let request = self.client.get(&url).query(&[
            ("select", "position".to_string()),
            ("playlist_id", format!("eq.{playlist_id}")),
            ("order", "position.desc".to_string()),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<PositionRow> = self.send_json(&url, request).await?;
        Ok(rows.first().map_or(0, |row| row.position + 1))
    }

    async fn insert_video(&self, video: NewVideo) -> Result<Video> {
        let source_url = video.source_url.clone();
        let mut row: Video = self.insert_row(VIDEOS_TABLE, &video).await?;
        row.source_url = source_url;
        Ok(row)
    }

    async fn delete_video(&self, video_id: &str) -> Result<()> {
        let url = self.table_url(VIDEOS_TABLE);
        debug!("DELETE {} id={}", url, video_id);
        let request = self
            .client
            .delete(&url)
            .query(&[("id", format!("eq.{video_id}"))]);
        self.send(&url, request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::StaticSession;
    use crate::error::ErrorKind;
    use crate::models::User;
    use mockito::Matcher;

    fn repository(server: &mockito::ServerGuard) -> RestRepository {
        let session = StaticSession::signed_in(
            User {
                id: "user-1".to_string(),
                email: "me@example.com".to_string(),
            },
            Some("user-jwt".to_string()),
        );
        RestRepository::new(
            RestConfig {
                base_url: format!("{}/", server.url()),
                anon_key: "anon".to_string(),
                timeout: Duration::from_secs(5),
            },
            Arc::new(session),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_user_playlists() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/playlists")
            .match_header("apikey", "anon")
            .match_header("authorization", "Bearer user-jwt")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("user_id".into(), "eq.user-1".into()),
                Matcher::UrlEncoded("order".into(), "created_at.desc".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{
                    "id": "p1", "name": "Mix", "user_id": "user-1", "is_public": false,
                    "created_at": "2024-05-01T10:00:00+00:00",
                    "playlist_videos": [
                        {"id": "v2", "playlist_id": "p1", "title": "B", "url": "https://www.youtube.com/embed/fJ9rUzIMcZQ", "thumbnail": "t", "position": 1},
                        {"id": "v1", "playlist_id": "p1", "title": "A", "url": "https://www.youtube.com/embed/dQw4w9WgXcQ", "thumbnail": "t", "position": 0}
                    ]
                }]"#,
            )
            .create_async()
            .await;

        let playlists = repository(&server).list_user_playlists("user-1").await.unwrap();
        mock.assert_async().await;
        assert_eq!(playlists.len(), 1);
        let ids: Vec<&str> = playlists[0].videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2"]);
    }

    #[tokio::test]
    async fn test_insert_video_keeps_source_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/playlist_videos")
            .match_header("prefer", "return=representation")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""playlist_id":"p1""#.to_string()),
                Matcher::Regex(r#""position":3"#.to_string()),
            ]))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id": "v9", "playlist_id": "p1", "title": "Intro", "url": "https://www.youtube.com/embed/dQw4w9WgXcQ", "thumbnail": "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg", "position": 3}]"#,
            )
            .create_async()
            .await;

        let video = repository(&server)
            .insert_video(NewVideo {
                playlist_id: "p1".to_string(),
                title: "Intro".to_string(),
                embed_url: "https://www.youtube.com/embed/dQw4w9WgXcQ".to_string(),
                thumbnail_url: "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
                source_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
                position: 3,
            })
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(video.id, "v9");
        assert_eq!(video.source_url, "https://youtu.be/dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_next_position() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/playlist_videos")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("playlist_id".into(), "eq.p1".into()),
                Matcher::UrlEncoded("order".into(), "position.desc".into()),
                Matcher::UrlEncoded("limit".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"position": 2}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/rest/v1/playlist_videos")
            .match_query(Matcher::UrlEncoded("playlist_id".into(), "eq.empty".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let repo = repository(&server);
        assert_eq!(repo.next_position("p1").await.unwrap(), 3);
        assert_eq!(repo.next_position("empty").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_visibility_and_delete() {
        let mut server = mockito::Server::new_async().await;
        let patch = server
            .mock("PATCH", "/rest/v1/playlists")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.p1".into()))
            .match_body(Matcher::Json(serde_json::json!({ "is_public": true })))
            .with_status(204)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/rest/v1/playlist_videos")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.v1".into()))
            .with_status(204)
            .create_async()
            .await;

        let repo = repository(&server);
        repo.set_visibility("p1", true).await.unwrap();
        repo.delete_video("v1").await.unwrap();
        patch.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/playlists")
            .with_status(401)
            .with_body(r#"{"message":"JWT expired"}"#)
            .create_async()
            .await;

        let err = repository(&server)
            .insert_playlist(NewPlaylist {
                name: "Mix".to_string(),
                owner_id: "user-1".to_string(),
                is_public: false,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(err.to_string().contains("JWT expired"));
        assert!(!err.is_retryable());
    }
}
