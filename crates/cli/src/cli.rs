//! Command-line definition, error mapping and exit codes

use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};
use esp_vault::config::TOKEN_FILE;
use esp_vault::{ConfigError, ConfigKey, ConfigStore, Provider, ProviderError};
use miette::{Diagnostic, Report};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Name of the binary, as Earthly invokes it
pub const BINARY_NAME: &str = "earthly-secret-provider-vault";

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Any failure other than "not found"
pub const EXIT_FAILURE: i32 = 1;
/// The secret does not exist; Earthly moves on to the next provider
pub const EXIT_NOT_FOUND: i32 = 2;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// No secret at the resolved path (exit code 2)
    #[error("secret not found: {message}")]
    #[diagnostic(code(esp::cli::not_found))]
    NotFound {
        /// The error message
        message: String,
    },
    /// Configuration error (exit code 1)
    #[error("configuration error: {message}")]
    #[diagnostic(code(esp::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Any other error (exit code 1)
    #[error("an error occurred: {message}")]
    #[diagnostic(code(esp::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error with help text
    #[must_use]
    pub fn other_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Remediation hint for a configuration error
fn config_help(err: &ConfigError) -> String {
    match err {
        ConfigError::NotConfigured { path, .. } => format!(
            "No config at {}. Create it with:\n  \
             {BINARY_NAME} config address <vault-address>\n  \
             {BINARY_NAME} config token <token>   (or run `vault login`)",
            path.display()
        ),
        ConfigError::MissingField { field } => {
            format!("Set it with `{BINARY_NAME} config {field} <value>`")
        }
        ConfigError::InvalidAddress { .. } => format!(
            "Set a full URL, e.g. `{BINARY_NAME} config address https://vault.example.com:8200`"
        ),
        ConfigError::UnsupportedKey { .. } => {
            let keys: Vec<_> = ConfigKey::ALL.iter().map(|k| k.as_str()).collect();
            format!("Supported keys: {}", keys.join(", "))
        }
        ConfigError::Parse { path, .. } => format!(
            "Fix or remove {} and set the values again with `{BINARY_NAME} config`",
            path.display()
        ),
        ConfigError::NoHomeDirectory => "Pass --config-file to choose a location".to_string(),
        ConfigError::Io { .. } | ConfigError::Serialize { .. } => {
            "Check file permissions and ensure the path exists".to_string()
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let help = config_help(&err);
        Self::config_with_help(err.to_string(), help)
    }
}

impl From<ProviderError> for CliError {
    fn from(err: ProviderError) -> Self {
        if err.is_not_found() {
            return Self::NotFound {
                message: err.to_string(),
            };
        }
        match err {
            ProviderError::Config(e) => e.into(),
            ProviderError::Client { message } => Self::other_with_help(
                message,
                format!("Check the address with `{BINARY_NAME} config address <vault-address>`"),
            ),
            ProviderError::Secret(e) => Self::other(e.to_string()),
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::NotFound { .. } => EXIT_NOT_FOUND,
        CliError::Config { .. } | CliError::Other { .. } => EXIT_FAILURE,
    }
}

/// Render an error on stderr. "Not found" is an expected outcome and only logged.
pub fn render_error(err: &CliError) {
    if let CliError::NotFound { message } = err {
        tracing::info!(%message, "secret not found");
        return;
    }

    let report = Report::new(err.clone());
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{report:?}");
    let _ = stderr.flush();
}

/// Earthly secret provider backed by HashiCorp Vault
#[derive(Parser, Debug)]
#[command(
    name = BINARY_NAME,
    version,
    about = "Secret provider for Earthly that reads secrets from HashiCorp Vault",
    long_about = "Secret provider for Earthly that reads secrets from HashiCorp Vault.\n\n\
        Run it with a lookup of the form `path/to/secret.field` to print the field's value\n\
        on stdout.\n\
        Exit code 2 means the secret was not found, so Earthly can try the next provider.\n\n\
        Configuration is read from ~/.earthly/vault.yml. The token from ~/.vault-token is used\n\
        unless vault.yml sets one. Set values with the config subcommand:\n\n  \
        vault login --method=userpass username=test\n  \
        earthly-secret-provider-vault config token \"$(vault print token)\"\n  \
        earthly-secret-provider-vault config address \"$VAULT_ADDR\"",
    subcommand_negates_reqs = true
)]
pub struct Cli {
    /// Lookup of the form `path/to/secret.field`
    #[arg(required = true, value_name = "LOOKUP")]
    pub lookup: Option<String>,

    /// Log level for progress messages on stderr
    #[arg(long, short = 'l', global = true, value_enum, default_value_t = LogLevel::Info)]
    pub level: LogLevel,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = TracingFormat::Compact)]
    pub log_format: TracingFormat,

    /// Abort the Vault read after this many seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Config file to use instead of ~/.earthly/vault.yml
    #[arg(long, global = true, env = "ESP_VAULT_CONFIG", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Token file to use instead of ~/.vault-token
    #[arg(long, global = true, env = "ESP_VAULT_TOKEN_FILE", value_name = "PATH")]
    pub token_file: Option<PathBuf>,

    /// Subcommand; without one the lookup is resolved
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Set a configuration value (token, address or prefix)
    ///
    /// Use an empty value to unset a key, e.g. `config prefix ""`.
    Config {
        /// Key to set: token, address or prefix
        #[arg(value_name = "KEY")]
        key: String,
        /// New value
        #[arg(value_name = "VALUE", allow_hyphen_values = true)]
        value: String,
    },
    /// Print version information
    Version,
}

impl Cli {
    /// Config store honouring the path overrides
    ///
    /// # Errors
    ///
    /// Returns an error if a default path is needed and the home directory is unknown.
    pub fn config_store(&self) -> Result<ConfigStore, CliError> {
        let config_file = match &self.config_file {
            Some(path) => path.clone(),
            None => ConfigStore::from_home()?.config_file().to_path_buf(),
        };
        let token_file = self
            .token_file
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(TOKEN_FILE)));
        Ok(ConfigStore::new(config_file, token_file))
    }

    /// Provider over [`Cli::config_store`]
    ///
    /// # Errors
    ///
    /// See [`Cli::config_store`].
    pub fn provider(&self) -> Result<Provider, CliError> {
        Ok(Provider::new(self.config_store()?))
    }

    /// Read deadline from `--timeout`
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

/// Parse the command line.
///
/// Help and version output exit with 0; usage errors exit with
/// [`EXIT_FAILURE`] so they are never mistaken for "not found".
pub fn parse() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = if err.use_stderr() { EXIT_FAILURE } else { EXIT_OK };
            std::process::exit(code);
        }
    }
}
