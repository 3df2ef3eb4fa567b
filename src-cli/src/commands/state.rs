//! Application state shared by the commands.

use std::path::PathBuf;
use std::sync::Arc;

use loopshare_core::billing::{BillingClient, HttpBillingClient};
use loopshare_core::repository::{FileRepository, PlaylistRepository, RestConfig, RestRepository};
use loopshare_core::{AppConfig, Error, PlaylistStore, Result, StaticSession};
use tracing::{debug, info};

/// Everything a command needs, built once from the configuration.
pub struct AppState {
    /// Loaded configuration.
    pub(crate) config: AppConfig,
    /// Signed-in identity shared by the store and the collaborators.
    pub(crate) session: Arc<StaticSession>,
    /// Playlist state.
    pub(crate) store: PlaylistStore,
    /// Billing collaborator; only available with a hosted backend.
    pub(crate) billing: Option<Arc<dyn BillingClient>>,
}

impl AppState {
    /// Load the configuration from `config_path` (or the default location)
    /// and wire up the collaborators it names.
    ///
    /// # Errors
    ///
    /// Returns an error if the config or the offline data file cannot be
    /// read, or an HTTP client cannot be built.
    pub async fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => AppConfig::load_from(&path)?,
            None => AppConfig::load()?,
        };
        Self::new(config).await
    }

    /// Build the state for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the offline data file cannot be read or an HTTP
    /// client cannot be built.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let access_token = config
            .backend
            .as_ref()
            .and_then(|backend| backend.access_token.clone());
        let session = Arc::new(match config.current_user() {
            Some(user) => {
                debug!("Configured user: {}", user.email);
                StaticSession::signed_in(user, access_token)
            }
            None => StaticSession::anonymous(),
        });

        let (repository, billing): (Arc<dyn PlaylistRepository>, Option<Arc<dyn BillingClient>>) =
            match &config.backend {
                Some(backend) => {
                    info!("Using hosted backend at {}", backend.url);
                    let repository: Arc<dyn PlaylistRepository> = Arc::new(RestRepository::new(
                        RestConfig {
                            base_url: backend.url.clone(),
                            anon_key: backend.anon_key.clone(),
                            timeout: config.request_timeout(),
                        },
                        session.clone(),
                    )?);
                    let billing: Arc<dyn BillingClient> = Arc::new(HttpBillingClient::new(
                        backend.functions_url(),
                        backend.anon_key.clone(),
                        config.request_timeout(),
                        session.clone(),
                    )?);
                    (repository, Some(billing))
                }
                None => {
                    info!("Using offline data file {}", config.data_file.display());
                    let repository: Arc<dyn PlaylistRepository> =
                        Arc::new(FileRepository::open(&config.data_file).await?);
                    (repository, None)
                }
            };

        let store = PlaylistStore::new(repository, session.clone())
            .with_thumbnail_quality(config.thumbnail_quality);

        Ok(Self {
            config,
            session,
            store,
            billing,
        })
    }

    /// Billing collaborator, or an error explaining why there is none.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no hosted backend is configured.
    pub fn billing(&self) -> Result<&dyn BillingClient> {
        self.billing.as_deref().ok_or_else(|| {
            Error::Configuration(
                "Subscriptions need a hosted backend; add a \"backend\" section to the config"
                    .to_string(),
            )
        })
    }
}
