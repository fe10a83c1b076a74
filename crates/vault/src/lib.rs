//! `HashiCorp` Vault integration for the Earthly secret provider
//!
//! - [`config`]: the persisted `vault.yml` record and the store that loads and edits it
//! - [`backend`]: [`esp_secrets::KvBackend`] over a `vaultrs` client (KV v2)
//! - [`provider`]: the facade the CLI calls to resolve one lookup

pub mod backend;
pub mod config;
pub mod provider;

pub use backend::VaultBackend;
pub use config::{ConfigError, ConfigKey, ConfigStore, VaultConfig};
pub use provider::{Provider, ProviderError};
