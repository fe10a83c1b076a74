//! Secret resolution core for the Earthly Vault secret provider
//!
//! Turns a flat lookup such as `db/creds.password` into a KV v2 backend path
//! and field, reads the path through a [`KvBackend`], and extracts the field
//! from the nested response.
//!
//! ```ignore
//! use esp_secrets::{MemoryBackend, SecretFetcher};
//! use tokio_util::sync::CancellationToken;
//!
//! let fetcher = SecretFetcher::new(backend, "team/app");
//! let secret = fetcher.fetch(&CancellationToken::new(), "creds.password").await?;
//! println!("{}", secret.expose());
//! ```
//!
//! The backend client is kept behind [`KvBackend`] so the resolver and
//! fetcher can be driven by scripted responses. The Vault implementation
//! lives in `esp-vault`.

mod backend;
mod fetcher;
mod lookup;
mod types;

pub use backend::{KvBackend, MemoryBackend, SecretResponse};
pub use fetcher::SecretFetcher;
pub use lookup::{DATA_SEGMENT, ResolvedPath, resolve};
pub use types::SecureSecret;

use thiserror::Error;

/// Why a backend response could not be decoded into a secret value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// The nested `data` container is absent or not a mapping
    MissingData,
    /// The nested container has no entry for the requested field
    MissingField,
    /// The field exists but its value is not a string
    NotAString,
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MissingData => "malformed secret data",
            Self::MissingField => "field not present in secret data",
            Self::NotAString => "malformed secret value",
        };
        f.write_str(s)
    }
}

/// Error types for secret resolution
#[derive(Debug, Error)]
pub enum SecretError {
    /// The lookup does not split into a path and a field
    #[error("invalid input: {lookup}")]
    MalformedLookup {
        /// The prefix-joined lookup that failed to split
        lookup: String,
    },

    /// The backend has no secret at the resolved path
    #[error("secret not found at '{path}'")]
    NotFound {
        /// Backend path that was read
        path: String,
    },

    /// The backend returned a secret that is not shaped as expected
    #[error("{reason} for field '{field}' at '{path}'")]
    MalformedResponse {
        /// Backend path that was read
        path: String,
        /// Field that was requested
        field: String,
        /// What was wrong with the response
        reason: MalformedReason,
    },

    /// Network, auth or protocol failure reported by the backend client
    #[error("backend read of '{path}' failed: {message}")]
    Backend {
        /// Backend path that was read
        path: String,
        /// Error message from the client
        message: String,
    },

    /// The caller cancelled the read or its deadline expired
    #[error("read of '{path}' was cancelled")]
    Cancelled {
        /// Backend path that was being read
        path: String,
    },
}

impl SecretError {
    /// Whether this error means "no secret here", as opposed to a failure.
    ///
    /// Callers in a provider chain use this to fall through to the next provider.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
