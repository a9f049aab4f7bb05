//! Lifecycle management: shutdown channel and OS signal handling.

use tokio::sync::watch;
use tracing::{info, warn};

/// Lifecycle manager
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    /// Clone a shutdown receiver
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn shutdown(&self) {
        info!("shutdown requested");
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for SIGINT/SIGTERM (Ctrl+C elsewhere), then signal shutdown.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match (
                signal(SignalKind::interrupt()),
                signal(SignalKind::terminate()),
            ) {
                (Ok(mut sigint), Ok(mut sigterm)) => {
                    tokio::select! {
                        _ = sigint.recv() => info!("SIGINT received"),
                        _ = sigterm.recv() => info!("SIGTERM received"),
                    }
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!("signal handler registration failed, falling back to Ctrl+C: {e}");
                    wait_ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        wait_ctrl_c().await;

        self.shutdown();
    }
}

async fn wait_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received"),
        Err(e) => warn!("Ctrl+C handler registration failed: {e}"),
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
