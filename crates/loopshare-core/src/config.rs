//! Application configuration management.
//!
//! Handles loading and saving the settings that decide which persistence
//! backend is used, who is signed in, and how shared links and thumbnails
//! are built.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::User;
use crate::resolver::ThumbnailQuality;

const APP_DIR: &str = "loopshare";

/// Origin used for share links when none is configured.
pub const DEFAULT_SHARE_ORIGIN: &str = "http://localhost:8080";

/// Hosted backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Public API key.
    pub anon_key: String,
    /// Access token of the signed-in user.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Base URL of the hosted functions. Defaults to `<url>/functions/v1`.
    #[serde(default)]
    pub functions_url: Option<String>,
}

impl BackendConfig {
    /// Base URL of the hosted billing functions.
    #[must_use]
    pub fn functions_url(&self) -> String {
        self.functions_url.clone().unwrap_or_else(|| {
            format!("{}/functions/v1", self.url.trim_end_matches('/'))
        })
    }
}

/// Signed-in identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserConfig {
    /// User id.
    pub id: String,
    /// Email address.
    pub email: String,
}

impl From<UserConfig> for User {
    fn from(user: UserConfig) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Hosted backend. Without one, playlists live in [`data_file`](Self::data_file).
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    /// Signed-in user.
    #[serde(default)]
    pub user: Option<UserConfig>,
    /// Origin of the web front end, used in share links.
    #[serde(default = "default_share_origin")]
    pub share_origin: String,
    /// Thumbnail size stored with new videos.
    #[serde(default)]
    pub thumbnail_quality: ThumbnailQuality,
    /// Per-request timeout for backend calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Offline playlist store.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

fn default_share_origin() -> String {
    DEFAULT_SHARE_ORIGIN.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: None,
            user: None,
            share_origin: default_share_origin(),
            thumbnail_quality: ThumbnailQuality::default(),
            request_timeout_secs: default_request_timeout_secs(),
            data_file: default_data_file(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, or defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `path`, or defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            Error::Configuration(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })?;

        info!("Loaded config from {}", path.display());
        debug!(
            "Backend: {}, data file: {}",
            config.backend.as_ref().map_or("offline", |b| b.url.as_str()),
            config.data_file.display()
        );
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Signed-in user, if configured.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.user.clone().map(User::from)
    }

    /// Backend request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get the path to the config file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        config_file_path()
    }
}

/// Default offline playlist store.
#[must_use]
pub fn default_data_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("playlists.json")
}

fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(APP_DIR)
        .join("config.json")
}
