//! Graceful shutdown handling
//!
//! The server stops accepting connections on SIGTERM, SIGINT or Ctrl+C (or
//! when a [`ShutdownController`] is triggered) and lets in-flight requests
//! finish before exiting.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

/// Shared shutdown flag
///
/// Clone this to share across tasks. Triggering is idempotent.
#[derive(Clone, Debug)]
pub struct ShutdownController {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownController {
    /// Create a controller in the running state
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown
    pub fn trigger(&self) {
        let changed = self.tx.send_if_modified(|stopping| {
            let was_running = !*stopping;
            *stopping = true;
            was_running
        });
        if changed {
            info!("Shutdown initiated");
        }
    }

    /// Resolve once shutdown has been requested
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so `wait_for` cannot fail on a closed channel.
        let _ = rx.wait_for(|stopping| *stopping).await;
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve when the process receives SIGTERM, SIGINT or Ctrl+C
///
/// A signal handler that cannot be installed is logged and ignored; the
/// remaining signals still work.
///
/// # Example
///
/// ```rust,no_run
/// use ddg_proxy::shutdown::shutdown_signal;
///
/// async fn run_server() -> std::io::Result<()> {
///     let listener = tokio::net::TcpListener::bind("0.0.0.0:8787").await?;
///     let app = axum::Router::new();
///
///     axum::serve(listener, app)
///         .with_graceful_shutdown(shutdown_signal())
///         .await
/// }
/// ```
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        }
        _ = terminate => {}
    }
}

/// Resolve on an OS shutdown signal or when `controller` is triggered,
/// whichever comes first. The controller is triggered either way.
pub async fn shutdown_signal_with_controller(controller: ShutdownController) {
    tokio::select! {
        _ = shutdown_signal() => controller.trigger(),
        _ = controller.wait() => {}
    }
    info!("Draining in-flight requests");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_pends_until_triggered() {
        let controller = ShutdownController::new();

        let waited = tokio::time::timeout(Duration::from_millis(50), controller.wait()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_trigger_is_idempotent() {
        let controller = ShutdownController::default();
        controller.trigger();
        controller.trigger();

        tokio::time::timeout(Duration::from_millis(100), controller.wait())
            .await
            .expect("wait did not resolve");
    }

    #[tokio::test]
    async fn test_wait_resolves_after_trigger() {
        let controller = ShutdownController::new();
        let waiter = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.wait().await })
        };

        controller.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait did not resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_signal_with_controller_resolves_on_trigger() {
        let controller = ShutdownController::new();
        let task = tokio::spawn(shutdown_signal_with_controller(controller.clone()));

        controller.trigger();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("shutdown future did not resolve")
            .unwrap();
    }
}
