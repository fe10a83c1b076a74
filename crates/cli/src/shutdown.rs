//! Cancellation of the in-flight read on signals or deadline

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Token cancelled on SIGINT, SIGTERM or once `deadline` has elapsed.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn cancel_on_shutdown(deadline: Option<Duration>) -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            () = trigger.cancelled() => return,
            () = wait_for_signal() => info!("Received shutdown signal, cancelling"),
            () = sleep_until_deadline(deadline) => warn!(
                timeout_secs = deadline.map(|d| d.as_secs()),
                "Deadline exceeded, cancelling"
            ),
        }
        trigger.cancel();
    });

    token
}

async fn sleep_until_deadline(deadline: Option<Duration>) {
    match deadline {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    () = ctrl_c() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}
