//! # Meeplo Client
//!
//! The Meeplo REST API wired through the remote-state synchronization core.
//!
//! - [`config`]: `ClientConfig` and its environment loader
//! - [`credentials`]: token stores consulted before authenticated calls
//! - [`http`]: the reqwest transport with one refresh-and-retry on `401`
//! - [`action`]: async actions, one remote call each
//! - [`api`]: the endpoint catalogue and its resource keys
//! - [`reducer`]: `SyncReducer`, the only writer of client state
//! - [`view`]: resource views for screens
//!
//! ## Example
//!
//! ```no_run
//! use meeplo_client::{ClientConfig, MeeploClient, api};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MeeploClient::connect(ClientConfig::from_env()?)?;
//!
//! let mut stations = client.view(api::keys::LOCATION).await?;
//! stations.dispatch(api::get_station_list("gangnam")).await?;
//! let resource = stations.settled().await?;
//! println!("{}: {:?}", resource.status(), resource.data());
//! # Ok(())
//! # }
//! ```

use meeplo_core::environment::{Clock, SystemClock};
use meeplo_core::transport::Transport;
use meeplo_runtime::{EffectHandle, StoreConfig, StoreError};
use std::sync::Arc;
use std::time::Duration;

pub mod action;
pub mod api;
pub mod config;
pub mod credentials;
pub mod http;
pub mod model;
pub mod reducer;
pub mod view;

pub use action::AsyncAction;
pub use config::{ClientConfig, ConfigError};
pub use credentials::{CredentialError, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use http::HttpTransport;
pub use model::Payload;
pub use reducer::{SyncAction, SyncEnvironment, SyncReducer, SyncState};
pub use view::{ResourceView, SyncStore, ViewError, ViewMode};

/// A running client: one store over the full endpoint catalogue.
#[derive(Clone)]
pub struct MeeploClient {
    store: SyncStore,
    credentials: Arc<dyn CredentialStore>,
}

impl MeeploClient {
    /// Build the HTTP stack described by `config`.
    ///
    /// Tokens are persisted in `config.credentials_path` when set, and kept
    /// in memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` does not validate.
    pub fn connect(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let credentials: Arc<dyn CredentialStore> = match &config.credentials_path {
            Some(path) => Arc::new(FileCredentialStore::new(path)),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        let transport = Arc::new(HttpTransport::new(config, Arc::clone(&credentials)));
        Ok(Self::from_parts(transport, credentials, Arc::new(SystemClock)))
    }

    /// Assemble a client from explicit parts.
    #[must_use]
    pub fn from_parts(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_store_config(transport, credentials, clock, StoreConfig::default())
    }

    /// Assemble a client with a custom store configuration.
    #[must_use]
    pub fn with_store_config(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        config: StoreConfig,
    ) -> Self {
        let store = SyncStore::with_config(
            SyncState::default(),
            SyncReducer,
            SyncEnvironment::new(transport, clock),
            config,
        );
        Self { store, credentials }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &SyncStore {
        &self.store
    }

    /// The token store.
    #[must_use]
    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    /// Open a view on `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::UnknownResource`] for keys outside the catalogue.
    pub async fn view(&self, key: &str) -> Result<ResourceView, ViewError> {
        ResourceView::open(self.store.clone(), key).await
    }

    /// Dispatch `action` without holding a view.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once shutdown has started.
    pub async fn dispatch(&self, action: AsyncAction) -> Result<EffectHandle, StoreError> {
        self.store.send(SyncAction::Dispatch(action)).await
    }

    /// Store the token pair obtained from the sign-in flow.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the tokens cannot be stored.
    pub async fn sign_in(&self, access_token: &str, refresh_token: &str) -> Result<(), CredentialError> {
        self.credentials.set(credentials::ACCESS_TOKEN, access_token).await?;
        self.credentials.set(credentials::REFRESH_TOKEN, refresh_token).await?;
        tracing::info!("Signed in");
        Ok(())
    }

    /// Forget the stored tokens.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the tokens cannot be removed.
    pub async fn sign_out(&self) -> Result<(), CredentialError> {
        self.credentials.remove(credentials::ACCESS_TOKEN).await?;
        self.credentials.remove(credentials::REFRESH_TOKEN).await?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Whether the member has been loaded.
    pub async fn is_logged_in(&self) -> bool {
        self.store.state(SyncState::is_logged_in).await
    }

    /// Stop accepting actions and wait for in-flight calls.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] when calls are still running
    /// after `timeout`; they are aborted.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}
