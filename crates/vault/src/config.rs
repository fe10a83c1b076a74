//! Persisted provider configuration (`~/.earthly/vault.yml`)
//!
//! The record holds the Vault token, the server address and an optional
//! lookup prefix. The token may instead come from `~/.vault-token`, the file
//! the `vault` CLI writes on login; it acts as the default and a non-empty
//! `token` in `vault.yml` overrides it.

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Directory under the home directory holding the config file
pub const CONFIG_DIR: &str = ".earthly";

/// Config file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "vault.yml";

/// Token file the `vault` CLI writes into the home directory
pub const TOKEN_FILE: &str = ".vault-token";

/// Configuration errors. None of these are retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be opened, usually because it was never written
    #[error("failed to open config file {}: {source}", .path.display())]
    NotConfigured {
        /// Config file location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the config file failed
    #[error("failed to {operation} {}: {source}", .path.display())]
    Io {
        /// What was being done, e.g. "write config file"
        operation: &'static str,
        /// File or directory involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for the expected record
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        /// Config file location
        path: PathBuf,
        /// YAML decoding error
        #[source]
        source: serde_yaml::Error,
    },

    /// The record could not be encoded
    #[error("failed to encode config: {source}")]
    Serialize {
        /// YAML encoding error
        #[source]
        source: serde_yaml::Error,
    },

    /// A required field is empty
    #[error("{field} is required")]
    MissingField {
        /// Name of the field
        field: ConfigKey,
    },

    /// The address is not an absolute http(s) URL
    #[error("address '{address}' should be a valid URL: {reason}")]
    InvalidAddress {
        /// The configured address
        address: String,
        /// Why it was rejected
        reason: String,
    },

    /// `set_key` was called with a key other than token, address or prefix
    #[error("key '{key}' is not supported")]
    UnsupportedKey {
        /// The rejected key
        key: String,
    },

    /// No home directory to derive default paths from
    #[error("could not determine home directory")]
    NoHomeDirectory,
}

impl ConfigError {
    /// Whether the config file is missing or unreadable, as opposed to present but invalid.
    #[must_use]
    pub const fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured { .. })
    }
}

/// A settable field of [`VaultConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// Vault token
    Token,
    /// Vault server address
    Address,
    /// Lookup prefix
    Prefix,
}

impl ConfigKey {
    /// All supported keys
    pub const ALL: [Self; 3] = [Self::Token, Self::Address, Self::Prefix];

    /// Key name as written in `vault.yml`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Address => "address",
            Self::Prefix => "prefix",
        }
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedKey { key: s.to_string() })
    }
}

/// Provider configuration
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Token used to authenticate with Vault
    #[serde(default)]
    pub token: String,

    /// Address of the Vault server
    #[serde(default)]
    pub address: String,

    /// Prepended to every lookup
    #[serde(default)]
    pub prefix: String,
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("token", &if self.token.is_empty() { "" } else { "[REDACTED]" })
            .field("address", &self.address)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl VaultConfig {
    /// Check the record is usable for a fetch.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for an empty token or address and
    /// [`ConfigError::InvalidAddress`] when the address is not an absolute
    /// `http` or `https` URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.is_empty() {
            return Err(ConfigError::MissingField {
                field: ConfigKey::Token,
            });
        }

        if self.address.is_empty() {
            return Err(ConfigError::MissingField {
                field: ConfigKey::Address,
            });
        }

        let url = Url::parse(&self.address).map_err(|e| ConfigError::InvalidAddress {
            address: self.address.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidAddress {
                address: self.address.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        Ok(())
    }

    /// Set a single field
    pub fn set(&mut self, key: ConfigKey, value: impl Into<String>) {
        let value = value.into();
        match key {
            ConfigKey::Token => self.token = value,
            ConfigKey::Address => self.address = value,
            ConfigKey::Prefix => self.prefix = value,
        }
    }

    /// Read a single field
    #[must_use]
    pub fn get(&self, key: ConfigKey) -> &str {
        match key {
            ConfigKey::Token => &self.token,
            ConfigKey::Address => &self.address,
            ConfigKey::Prefix => &self.prefix,
        }
    }
}

/// On-disk shape of `vault.yml`; absent fields stay `None` so they can fall back.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    token: Option<String>,
    address: Option<String>,
    prefix: Option<String>,
}

impl ConfigFile {
    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn io_error(operation: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError {
    let path = path.to_path_buf();
    move |source| ConfigError::Io {
        operation,
        path,
        source,
    }
}

/// Loads and edits the config file at a fixed location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    config_file: PathBuf,
    token_file: Option<PathBuf>,
}

impl ConfigStore {
    /// Create a store for `config_file`, optionally seeding the token from `token_file`
    pub fn new(config_file: impl Into<PathBuf>, token_file: Option<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
            token_file,
        }
    }

    /// Store at the default locations: `~/.earthly/vault.yml` and `~/.vault-token`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDirectory`] if the home directory is unknown.
    pub fn from_home() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(Self::new(
            home.join(CONFIG_DIR).join(CONFIG_FILE),
            Some(home.join(TOKEN_FILE)),
        ))
    }

    /// Location of the config file
    #[must_use]
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Location of the token file, if any
    #[must_use]
    pub fn token_file(&self) -> Option<&Path> {
        self.token_file.as_deref()
    }

    /// Token from the token file. Unreadable or empty means no token.
    fn file_token(&self) -> Option<String> {
        let path = self.token_file.as_ref()?;
        match fs::read_to_string(path) {
            Ok(contents) => {
                let token = contents.trim_end().to_string();
                if token.is_empty() { None } else { Some(token) }
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no token file");
                None
            }
        }
    }

    /// Load and validate the config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] when the config file cannot be
    /// opened, [`ConfigError::Parse`] when it is not valid YAML, and the
    /// errors of [`VaultConfig::validate`] when the merged record is invalid.
    pub fn load(&self) -> Result<VaultConfig, ConfigError> {
        let seeded_token = self.file_token();

        let mut file =
            File::open(&self.config_file).map_err(|source| ConfigError::NotConfigured {
                path: self.config_file.clone(),
                source,
            })?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(io_error("read config file", &self.config_file))?;
        let decoded = ConfigFile::parse(&contents, &self.config_file)?;

        let from_token_file =
            seeded_token.is_some() && decoded.token.as_ref().is_none_or(String::is_empty);
        let config = VaultConfig {
            token: decoded
                .token
                .filter(|t| !t.is_empty())
                .or(seeded_token)
                .unwrap_or_default(),
            address: decoded.address.unwrap_or_default(),
            prefix: decoded.prefix.unwrap_or_default(),
        };
        debug!(
            path = %self.config_file.display(),
            address = %config.address,
            prefix = %config.prefix,
            from_token_file,
            "loaded config"
        );

        config.validate()?;
        Ok(config)
    }

    /// Set one field and rewrite the whole file.
    ///
    /// Creates the file (mode `0600` on Unix) and its directory when missing;
    /// an empty file counts as no prior config. Not safe to call
    /// concurrently for the same file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedKey`] for keys other than `token`,
    /// `address` and `prefix`, [`ConfigError::Parse`] if the existing file
    /// is not valid YAML, and [`ConfigError::Io`] for file system failures.
    pub fn set_key(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let key = ConfigKey::from_str(key)?;
        let path = &self.config_file;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_error("create config directory", parent))?;
        }

        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(path)
            .map_err(io_error("open or create config file", path))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(io_error("read config file", path))?;
        let existing = ConfigFile::parse(&contents, path)?;

        let mut config = VaultConfig {
            token: existing.token.unwrap_or_default(),
            address: existing.address.unwrap_or_default(),
            prefix: existing.prefix.unwrap_or_default(),
        };
        config.set(key, value);
        let encoded =
            serde_yaml::to_string(&config).map_err(|source| ConfigError::Serialize { source })?;

        file.set_len(0)
            .map_err(io_error("truncate config file", path))?;
        file.seek(SeekFrom::Start(0))
            .map_err(io_error("rewind config file", path))?;
        file.write_all(encoded.as_bytes())
            .map_err(io_error("write config file", path))?;
        file.flush().map_err(io_error("flush config file", path))?;

        debug!(path = %path.display(), %key, "updated config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join(CONFIG_DIR).join(CONFIG_FILE), None)
    }

    fn store_with_token_file(dir: &TempDir, token: &str) -> ConfigStore {
        let token_file = dir.path().join(TOKEN_FILE);
        fs::write(&token_file, token).unwrap();
        ConfigStore::new(dir.path().join(CONFIG_FILE), Some(token_file))
    }

    fn valid_config() -> VaultConfig {
        VaultConfig {
            token: "s.token".to_string(),
            address: "https://vault.example.com:8200".to_string(),
            prefix: String::new(),
        }
    }

    #[test]
    fn test_validate_accepts_https_address() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_http_address() {
        let config = VaultConfig {
            address: "http://127.0.0.1:8200".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_invalid_address() {
        for address in ["not a url", "vault.example.com", "/v1/secret"] {
            let config = VaultConfig {
                address: address.to_string(),
                ..valid_config()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidAddress { .. })),
                "{address} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let config = VaultConfig {
            address: "ftp://vault.example.com".to_string(),
            ..valid_config()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn test_validate_requires_token_and_address() {
        let no_token = VaultConfig {
            token: String::new(),
            ..valid_config()
        };
        assert!(matches!(
            no_token.validate(),
            Err(ConfigError::MissingField {
                field: ConfigKey::Token
            })
        ));

        let no_address = VaultConfig {
            address: String::new(),
            ..valid_config()
        };
        let err = no_address.validate().unwrap_err();
        assert_eq!(err.to_string(), "address is required");
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", valid_config());
        assert!(!debug.contains("s.token"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("vault.example.com"));
    }

    #[test]
    fn test_set_and_get_each_field() {
        let mut config = VaultConfig::default();
        for key in ConfigKey::ALL {
            config.set(key, format!("value-{key}"));
        }
        assert_eq!(config.get(ConfigKey::Token), "value-token");
        assert_eq!(config.get(ConfigKey::Address), "value-address");
        assert_eq!(config.get(ConfigKey::Prefix), "value-prefix");
    }

    #[test]
    fn test_config_key_parse() {
        assert_eq!("token".parse::<ConfigKey>().unwrap(), ConfigKey::Token);
        assert_eq!("address".parse::<ConfigKey>().unwrap(), ConfigKey::Address);
        assert_eq!("prefix".parse::<ConfigKey>().unwrap(), ConfigKey::Prefix);
        assert!(matches!(
            "namespace".parse::<ConfigKey>(),
            Err(ConfigError::UnsupportedKey { ref key }) if key == "namespace"
        ));
    }

    #[test]
    fn test_load_missing_file_is_not_configured() {
        let dir = TempDir::new().unwrap();
        let err = store_in(&dir).load().unwrap_err();
        assert!(err.is_not_configured());
    }

    #[test]
    fn test_load_invalid_config_is_not_not_configured() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set_key("address", "not a url").unwrap();
        store.set_key("token", "s.token").unwrap();

        let err = store.load().unwrap_err();
        assert!(!err.is_not_configured());
        assert!(matches!(err, ConfigError::InvalidAddress { .. }));
    }

    #[test]
    fn test_load_malformed_yaml() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join(CONFIG_FILE), None);
        fs::write(store.config_file(), "address: [unterminated").unwrap();

        assert!(matches!(store.load(), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_ignores_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join(CONFIG_FILE), None);
        fs::write(
            store.config_file(),
            "token: s.token\naddress: https://vault.example.com\nnamespace: admin\n",
        )
        .unwrap();

        let config = store.load().unwrap();
        assert_eq!(config.address, "https://vault.example.com");
        assert_eq!(config.prefix, "");
    }

    #[test]
    fn test_token_file_seeds_token() {
        let dir = TempDir::new().unwrap();
        let store = store_with_token_file(&dir, "s.from-home\n");
        fs::write(store.config_file(), "address: https://vault.example.com\n").unwrap();

        assert_eq!(store.load().unwrap().token, "s.from-home");
    }

    #[test]
    fn test_explicit_config_token_overrides_token_file() {
        let dir = TempDir::new().unwrap();
        let store = store_with_token_file(&dir, "s.from-home");
        fs::write(
            store.config_file(),
            "token: s.from-config\naddress: https://vault.example.com\n",
        )
        .unwrap();

        assert_eq!(store.load().unwrap().token, "s.from-config");
    }

    #[test]
    fn test_empty_config_token_falls_back_to_token_file() {
        let dir = TempDir::new().unwrap();
        let store = store_with_token_file(&dir, "s.from-home");
        fs::write(
            store.config_file(),
            "token: ''\naddress: https://vault.example.com\nprefix: ''\n",
        )
        .unwrap();

        assert_eq!(store.load().unwrap().token, "s.from-home");
    }

    #[test]
    fn test_empty_token_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = store_with_token_file(&dir, "\n");
        fs::write(store.config_file(), "address: https://vault.example.com\n").unwrap();

        assert!(matches!(
            store.load(),
            Err(ConfigError::MissingField {
                field: ConfigKey::Token
            })
        ));
    }

    #[test]
    fn test_missing_token_file_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(
            dir.path().join(CONFIG_FILE),
            Some(dir.path().join("does-not-exist")),
        );
        fs::write(
            store.config_file(),
            "token: s.token\naddress: https://vault.example.com\n",
        )
        .unwrap();

        assert_eq!(store.load().unwrap().token, "s.token");
    }

    #[test]
    fn test_set_key_creates_file_with_three_fields() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(!store.config_file().exists());

        store.set_key("prefix", "team/x").unwrap();

        let written = fs::read_to_string(store.config_file()).unwrap();
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(&written).unwrap();
        assert_eq!(mapping.len(), 3);
        let field = |name: &str| {
            mapping
                .get(name)
                .and_then(serde_yaml::Value::as_str)
                .map(str::to_string)
        };
        assert_eq!(field("prefix").as_deref(), Some("team/x"));
        assert_eq!(field("token").as_deref(), Some(""));
        assert_eq!(field("address").as_deref(), Some(""));
    }

    #[cfg(unix)]
    #[test]
    fn test_set_key_creates_owner_only_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set_key("prefix", "team/x").unwrap();

        let mode = fs::metadata(store.config_file()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_set_key_round_trips_each_key() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set_key("token", "s.round-trip").unwrap();
        store.set_key("address", "https://vault.example.com:8200").unwrap();
        store.set_key("prefix", "team/app").unwrap();

        let config = store.load().unwrap();
        assert_eq!(config.token, "s.round-trip");
        assert_eq!(config.address, "https://vault.example.com:8200");
        assert_eq!(config.prefix, "team/app");
    }

    #[test]
    fn test_set_key_overwrites_previous_value() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set_key("token", "s.token").unwrap();
        store.set_key("address", "https://a-much-longer-address.example.com:8200").unwrap();
        store.set_key("address", "http://short").unwrap();

        let config = store.load().unwrap();
        assert_eq!(config.address, "http://short");
        assert_eq!(config.token, "s.token");
    }

    #[test]
    fn test_set_key_empty_value_unsets() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set_key("prefix", "team").unwrap();
        store.set_key("prefix", "").unwrap();

        let written = fs::read_to_string(store.config_file()).unwrap();
        let config: VaultConfig = serde_yaml::from_str(&written).unwrap();
        assert_eq!(config.prefix, "");
    }

    #[test]
    fn test_set_key_on_empty_file() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join(CONFIG_FILE), None);
        fs::write(store.config_file(), "").unwrap();

        store.set_key("address", "https://vault.example.com").unwrap();

        let written = fs::read_to_string(store.config_file()).unwrap();
        let config: VaultConfig = serde_yaml::from_str(&written).unwrap();
        assert_eq!(config.address, "https://vault.example.com");
    }

    #[test]
    fn test_set_key_drops_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join(CONFIG_FILE), None);
        fs::write(store.config_file(), "namespace: admin\nprefix: team\n").unwrap();

        store.set_key("token", "s.token").unwrap();

        let written = fs::read_to_string(store.config_file()).unwrap();
        assert!(!written.contains("namespace"));
        assert!(written.contains("team"));
    }

    #[test]
    fn test_set_key_unsupported_key() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let err = store.set_key("namespace", "admin").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedKey { .. }));
        assert_eq!(err.to_string(), "key 'namespace' is not supported");
        assert!(!store.config_file().exists());
    }

    #[test]
    fn test_from_home_uses_home_directory() {
        let dir = TempDir::new().unwrap();
        temp_env::with_var("HOME", Some(dir.path()), || {
            let store = ConfigStore::from_home().unwrap();
            assert_eq!(
                store.config_file(),
                dir.path().join(".earthly").join("vault.yml")
            );
            assert_eq!(store.token_file(), Some(dir.path().join(".vault-token").as_path()));
        });
    }
}
