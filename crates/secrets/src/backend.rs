//! Backend read capability and the in-memory backend

use crate::SecretError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A secret as returned by a backend read.
///
/// For KV v2 the values live one level down, under the `data` key:
/// `{"data": {"password": "hunter2"}, "metadata": {...}}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecretResponse {
    /// Top-level response mapping
    pub data: Map<String, Value>,
}

impl SecretResponse {
    /// Wrap a raw top-level mapping
    #[must_use]
    pub const fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// Build a KV v2 response holding the given string fields
    #[must_use]
    pub fn kv2<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let inner: Map<String, Value> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        let mut data = Map::new();
        data.insert("data".to_string(), Value::Object(inner));
        Self { data }
    }

    /// The nested `data` mapping, if present and a mapping
    #[must_use]
    pub fn nested_data(&self) -> Option<&Map<String, Value>> {
        self.data.get("data").and_then(Value::as_object)
    }
}

/// Read access to a key-value secret backend.
///
/// This is the only operation the fetcher needs from a backend client.
/// `Ok(None)` means the backend has nothing at `path`.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Read the secret stored at `path`.
    async fn read(&self, path: &str) -> Result<Option<SecretResponse>, SecretError>;

    /// Backend identifier used in log output.
    fn backend_name(&self) -> &'static str;
}

/// Backend serving scripted responses from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    secrets: HashMap<String, SecretResponse>,
}

impl MemoryBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `response` at `path`, replacing any previous entry
    #[must_use]
    pub fn with_secret(mut self, path: impl Into<String>, response: SecretResponse) -> Self {
        self.secrets.insert(path.into(), response);
        self
    }

    /// Number of stored paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether no paths are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn read(&self, path: &str) -> Result<Option<SecretResponse>, SecretError> {
        Ok(self.secrets.get(path).cloned())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
