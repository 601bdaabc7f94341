//! Kubernetes resource watchers.
//!
//! Every declared kind runs in its own `kube_runtime::Controller`, which
//! owns the informer cache, deduplicates keys, limits concurrency and
//! requeues failed keys according to the reconciler's error policy.

use crate::error::ControllerError;
use crate::reconciler::{object_key, Reconciler};
use crate::shutdown::ShutdownSignal;
use crds::Reconcilable;
use futures::{FutureExt, StreamExt};
use kube::ResourceExt;
use kube_runtime::controller::Config as RuntimeConfig;
use kube_runtime::Controller;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Time to wait after the last event on a key before reconciling it.
const DEBOUNCE: Duration = Duration::from_secs(1);

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Drives `controller` with `reconciler` until `shutdown` fires.
///
/// Panics inside a reconcile are caught and reported as internal errors, so
/// one faulty object cannot take the worker down.
pub async fn watch_resource<K>(
    controller: Controller<K>,
    reconciler: Arc<Reconciler<K>>,
    workers: u16,
    shutdown: ShutdownSignal,
    resource_name: &'static str,
) -> Result<(), ControllerError>
where
    K: Reconcilable,
{
    info!("Starting {} watcher with {} workers", resource_name, workers);

    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler<K>>| {
        let key = object_key(&obj.namespace().unwrap_or_default(), &obj.name_any());
        warn!("Reconciliation error for {} {}: {}", resource_name, key, error);
        ctx.error_action(&key, error)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler<K>>| async move {
        let namespace = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        debug!("Reconciling {} {}/{}", resource_name, namespace, name);

        let outcome = AssertUnwindSafe(ctx.reconcile(&namespace, &name)).catch_unwind().await;
        match outcome {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Reconcile of {} {}/{} panicked: {}", resource_name, namespace, name, message);
                ctx.record_panic(&obj, &message).await;
                Err(ControllerError::Internal(format!("reconcile panicked: {}", message)))
            }
        }
    };

    let runtime_config = RuntimeConfig::default().debounce(DEBOUNCE).concurrency(workers);

    controller
        .with_config(runtime_config)
        .graceful_shutdown_on(shutdown.into_future())
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, action)) => debug!("Reconciled {} {}: {:?}", resource_name, obj, action),
                Err(e) => warn!("Controller error for {}: {}", resource_name, e),
            }
        })
        .await;

    info!("{} watcher stopped", resource_name);
    Ok(())
}
