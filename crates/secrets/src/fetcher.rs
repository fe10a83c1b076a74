//! Secret fetching against a [`KvBackend`]

use crate::backend::{KvBackend, SecretResponse};
use crate::lookup::resolve;
use crate::{MalformedReason, SecretError, SecureSecret};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Resolves lookups under a fixed prefix and reads them from a backend
#[derive(Debug)]
pub struct SecretFetcher<B> {
    prefix: String,
    backend: B,
}

impl<B: KvBackend> SecretFetcher<B> {
    /// Bind a backend and the prefix prepended to every lookup
    pub fn new(backend: B, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            backend,
        }
    }

    /// The configured prefix
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Fetch the value addressed by `lookup`.
    ///
    /// The value is returned verbatim. `cancel` aborts the backend read; a
    /// token that is already cancelled fails before the backend is touched.
    ///
    /// # Errors
    ///
    /// - [`SecretError::MalformedLookup`] if the lookup has no `path.field` shape
    /// - [`SecretError::NotFound`] if the backend has no secret at the path
    /// - [`SecretError::MalformedResponse`] if the secret exists but the field
    ///   cannot be extracted as a string
    /// - [`SecretError::Cancelled`] if `cancel` fires before the read completes
    /// - [`SecretError::Backend`] for client failures
    pub async fn fetch(
        &self,
        cancel: &CancellationToken,
        lookup: &str,
    ) -> Result<SecureSecret, SecretError> {
        tracing::info!(lookup, "got request");

        let resolved = resolve(lookup, &self.prefix)?;
        tracing::info!(
            field = %resolved.field,
            path = %resolved.backend_path,
            backend = self.backend.backend_name(),
            "looking for field in path"
        );

        let response = self.read(cancel, &resolved.backend_path).await?;
        let Some(response) = response else {
            return Err(SecretError::NotFound {
                path: resolved.backend_path,
            });
        };

        extract_field(&response, &resolved.backend_path, &resolved.field)
    }

    async fn read(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<Option<SecretResponse>, SecretError> {
        if cancel.is_cancelled() {
            return Err(SecretError::Cancelled {
                path: path.to_string(),
            });
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(SecretError::Cancelled {
                path: path.to_string(),
            }),
            result = self.backend.read(path) => result,
        }
    }
}

fn extract_field(
    response: &SecretResponse,
    path: &str,
    field: &str,
) -> Result<SecureSecret, SecretError> {
    let malformed = |reason| SecretError::MalformedResponse {
        path: path.to_string(),
        field: field.to_string(),
        reason,
    };

    let data = response
        .nested_data()
        .ok_or_else(|| malformed(MalformedReason::MissingData))?;

    match data.get(field) {
        Some(Value::String(value)) => Ok(SecureSecret::new(value.clone())),
        Some(_) => Err(malformed(MalformedReason::NotAString)),
        None => Err(malformed(MalformedReason::MissingField)),
    }
}
