//! OS signal handling.
//!
//! SIGINT (Ctrl+C) and SIGTERM both trigger a graceful shutdown through
//! the [`Shutdown`] coordinator.

use tokio::sync::broadcast;

use crate::lifecycle::shutdown::Shutdown;

/// Spawn a task that fires `shutdown` on the first termination signal.
pub fn spawn_signal_handler(shutdown: Shutdown) {
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });
}

/// Subscribe to `shutdown`, then start the signal handler.
///
/// The receiver exists before the handler can fire, so no signal is missed.
pub fn listen_for_signals(shutdown: Shutdown) -> broadcast::Receiver<()> {
    let rx = shutdown.subscribe();
    spawn_signal_handler(shutdown);
    rx
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "Shutdown signal received"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "Shutdown signal received"),
    }
}
