//! Provider facade: config in, one resolved secret out

use crate::backend::VaultBackend;
use crate::config::{ConfigError, ConfigStore};
use esp_secrets::{SecretError, SecretFetcher, SecureSecret};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors surfaced by [`Provider`]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Loading, validating or editing the config failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The Vault client could not be constructed
    #[error("{message}")]
    Client {
        /// What went wrong
        message: String,
    },

    /// Resolving or fetching the secret failed
    #[error(transparent)]
    Secret(#[from] SecretError),
}

impl ProviderError {
    /// Whether the backend had no secret for the lookup
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Secret(e) if e.is_not_found())
    }

    /// The underlying config error, if this is one
    #[must_use]
    pub const fn as_config(&self) -> Option<&ConfigError> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// Resolves lookups against the Vault server named in the config.
///
/// Every call loads the config afresh and builds its own client; nothing is
/// kept between calls.
#[derive(Debug, Clone)]
pub struct Provider {
    store: ConfigStore,
}

impl Provider {
    /// Create a provider backed by `store`
    #[must_use]
    pub const fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    /// Provider using the default config locations under the home directory
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn from_home() -> Result<Self, ProviderError> {
        Ok(Self::new(ConfigStore::from_home()?))
    }

    /// The config store in use
    #[must_use]
    pub const fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Load the config and bind a fetcher to a fresh Vault client.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if the config is missing or invalid
    /// and [`ProviderError::Client`] if the client cannot be built.
    pub fn load_fetcher(&self) -> Result<SecretFetcher<VaultBackend>, ProviderError> {
        let config = self.store.load()?;
        let backend = VaultBackend::connect(&config.address, &config.token)?;
        tracing::debug!(
            address = %backend.address(),
            prefix = %config.prefix,
            "vault client ready"
        );
        Ok(SecretFetcher::new(backend, config.prefix))
    }

    /// Resolve a single lookup.
    ///
    /// # Errors
    ///
    /// See [`Provider::load_fetcher`] and [`SecretFetcher::fetch`].
    pub async fn resolve(
        &self,
        cancel: &CancellationToken,
        lookup: &str,
    ) -> Result<SecureSecret, ProviderError> {
        let fetcher = self.load_fetcher()?;
        Ok(fetcher.fetch(cancel, lookup).await?)
    }

    /// Set one config key, rewriting the config file.
    ///
    /// # Errors
    ///
    /// See [`ConfigStore::set_key`].
    pub fn set_config_key(&self, key: &str, value: &str) -> Result<(), ProviderError> {
        self.store.set_key(key, value)?;
        Ok(())
    }
}
