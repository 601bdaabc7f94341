//! Shutdown propagation.
//!
//! A single `tokio::sync::watch` channel flips to `true` when the process
//! receives SIGINT or SIGTERM. Controllers stop accepting work and every
//! provider call in flight races against the signal.

use crate::error::ControllerError;
use std::future::Future;
use tokio::sync::watch;
use tracing::{info, warn};

/// Sending half, owned by the process entry point.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Receiving half, cloned into every controller and reconcile.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Creates a connected trigger/signal pair.
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownTrigger {
    /// Broadcasts the shutdown to every signal.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Triggers the shutdown on SIGINT or SIGTERM.
    pub async fn trigger_on_signals(self) {
        wait_for_os_signal().await;
        info!("Shutdown signal received, stopping controllers");
        self.trigger();
    }
}

#[cfg(unix)]
async fn wait_for_os_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!("Cannot install SIGTERM handler ({}), listening for SIGINT only", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_os_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

impl ShutdownSignal {
    /// Whether shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested.
    ///
    /// Never resolves when the trigger was dropped without firing.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Owned variant of `cancelled()` for APIs requiring a `'static` future.
    pub fn into_future(self) -> impl Future<Output = ()> + Send + Sync + 'static {
        async move { self.cancelled().await }
    }

    /// Runs `fut` unless shutdown is requested first, in which case
    /// `ControllerError::Cancelled` is returned and `fut` is dropped.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, ControllerError>
    where
        F: Future<Output = Result<T, ControllerError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ControllerError::Cancelled),
            result = fut => result,
        }
    }
}
