//! TriggerMesh Controller
//!
//! Reconciles TriggerMesh components declared as custom resources into
//! running adapter workloads and, for event sources, into subscriptions at
//! the third-party provider.
//!
//! This controller watches `AzureEventGridSource` and
//! `DataWeaveTransformation` resources.

mod backoff;
mod cluster;
mod config;
mod controller;
mod error;
mod events;
mod lister;
mod manifests;
mod reconciler;
mod shutdown;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting TriggerMesh Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Workers per kind: {}", config.workers);
    info!(
        "  Backoff: {}s base, {}s max",
        config.backoff_base_seconds, config.backoff_max_seconds
    );
    info!("  AzureEventGridSource image: {}", config.azure_event_grid_source_image);
    info!("  DataWeaveTransformation image: {}", config.dataweave_transformation_image);
    info!("  Azure management endpoint: {}", config.azure_endpoints.management);

    let (trigger, signal) = shutdown::channel();
    tokio::spawn(trigger.trigger_on_signals());

    // Initialize and run controller
    let controller = Controller::new(config, signal).await?;
    controller.run().await?;

    info!("TriggerMesh Controller exited cleanly");
    Ok(())
}
