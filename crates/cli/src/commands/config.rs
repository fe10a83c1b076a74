//! `config` command: set one key in vault.yml

use crate::cli::CliError;
use esp_vault::Provider;

/// Set `key` to `value` in the provider's config file
///
/// # Errors
///
/// Returns a configuration error for unsupported keys or file failures.
pub fn execute_config(provider: &Provider, key: &str, value: &str) -> Result<(), CliError> {
    provider.set_config_key(key, value)?;
    tracing::info!(
        key,
        path = %provider.store().config_file().display(),
        "config updated"
    );
    Ok(())
}
