//! Secret lookup: resolve and write the value to the output sink

use crate::cli::CliError;
use esp_vault::Provider;
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Resolve `lookup` and write the value to `out` verbatim, without a trailing newline
///
/// # Errors
///
/// Returns [`CliError::NotFound`] when the secret does not exist and other
/// variants for configuration, lookup, backend and output failures.
pub async fn execute_get(
    provider: &Provider,
    cancel: &CancellationToken,
    lookup: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let secret = provider.resolve(cancel, lookup).await?;

    out.write_all(secret.as_bytes())
        .and_then(|()| out.flush())
        .map_err(|e| CliError::other(format!("failed to write secret: {e}")))?;

    tracing::debug!(len = secret.len(), "secret written");
    Ok(())
}
