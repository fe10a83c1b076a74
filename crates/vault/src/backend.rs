//! KV v2 reads through the `vaultrs` client

use crate::provider::ProviderError;
use async_trait::async_trait;
use esp_secrets::{DATA_SEGMENT, KvBackend, SecretError, SecretResponse};
use serde_json::{Map, Value};
use url::Url;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;

/// Reads secrets from a Vault server
pub struct VaultBackend {
    client: VaultClient,
    address: String,
}

impl std::fmt::Debug for VaultBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultBackend")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl VaultBackend {
    /// Build a client for `address` authenticated with `token`.
    ///
    /// No request is sent; connection problems surface on the first read.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Client`] if the address is not a URL or the
    /// client cannot be built.
    pub fn connect(address: &str, token: &str) -> Result<Self, ProviderError> {
        Url::parse(address).map_err(|e| ProviderError::Client {
            message: format!("invalid address '{address}': {e}"),
        })?;

        let settings = VaultClientSettingsBuilder::default()
            .address(address)
            .token(token)
            .build()
            .map_err(|e| ProviderError::Client {
                message: format!("failed to build Vault client settings: {e}"),
            })?;
        let client = VaultClient::new(settings).map_err(|e| ProviderError::Client {
            message: format!("failed to create Vault client: {e}"),
        })?;

        Ok(Self {
            client,
            address: address.to_string(),
        })
    }

    /// Address the client talks to
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// Split `mount/data/path` into the mount and the secret path.
fn split_kv2_path(path: &str) -> Option<(&str, &str)> {
    let (mount, rest) = path.split_once('/')?;
    if mount.is_empty() {
        return None;
    }
    let rest = rest.strip_prefix(DATA_SEGMENT)?;
    if rest.is_empty() {
        return Some((mount, rest));
    }
    rest.strip_prefix('/').map(|secret| (mount, secret))
}

#[async_trait]
impl KvBackend for VaultBackend {
    async fn read(&self, path: &str) -> Result<Option<SecretResponse>, SecretError> {
        let Some((mount, secret_path)) = split_kv2_path(path) else {
            return Err(SecretError::Backend {
                path: path.to_string(),
                message: format!("not a KV v2 path, expected '<mount>/{DATA_SEGMENT}/<path>'"),
            });
        };

        match vaultrs::kv2::read::<Value>(&self.client, mount, secret_path).await {
            Ok(data) => {
                let mut response = Map::new();
                response.insert("data".to_string(), data);
                Ok(Some(SecretResponse::new(response)))
            }
            Err(ClientError::APIError { code: 404, .. }) => Ok(None),
            Err(e) => Err(SecretError::Backend {
                path: path.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn backend_name(&self) -> &'static str {
        "vault"
    }
}
