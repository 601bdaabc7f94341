//! Reconciliation core.
//!
//! `Reconciler<K>` is the kind-agnostic dispatcher. A kind plugs in an
//! `AdapterBuilder` and, when it keeps state at a third-party provider, a
//! `SubscriptionReconciler`:
//!
//! - `sources`: event sources (`AzureEventGridSource`)
//! - `flow`: transformations (`DataWeaveTransformation`)

pub mod adapter;
pub mod finalizer;
pub mod flow;
pub mod sink;
pub mod sources;
pub mod status;
pub mod subscription;
pub mod workload;

#[cfg(test)]
mod dispatcher_test;

use crate::backoff::ExponentialBackoff;
use crate::cluster::{ClusterClient, ObjectClient};
use crate::config::ControllerConfig;
use crate::error::{ControllerError, ErrorClass};
use crate::events::{reasons, EventRecorder, RecordedEvent};
use crate::lister::Lister;
use crate::shutdown::ShutdownSignal;
use adapter::{AdapterBuilder, WorkloadSpec};
use crds::Reconcilable;
use finalizer::{has_finalizer, FinalizerManager};
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use serde_json::{json, Map, Value};
use sink::SinkResolver;
use status::StatusManager;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subscription::SubscriptionReconciler;
use tracing::{debug, error, info, instrument, warn};
use workload::{WorkloadOutcome, WorkloadReconciler};

/// Requeue delay after the finalizer was added.
const FINALIZER_REQUEUE: Duration = Duration::from_secs(1);

/// Handles shared with kind-specific reconcilers for one reconcile.
#[derive(Clone)]
pub struct ReconcileContext {
    pub recorder: Arc<dyn EventRecorder>,
    pub shutdown: ShutdownSignal,
}

impl std::fmt::Debug for ReconcileContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileContext")
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

/// Backoff state for a reconcile key
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: ExponentialBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new(base_seconds: u64, max_seconds: u64) -> Self {
        Self {
            backoff: ExponentialBackoff::new(base_seconds, max_seconds),
            error_count: 0,
        }
    }

    fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// `<namespace>/<name>`
pub fn object_key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

/// JSON merge patch turning `before` into `after`. Keys absent from `after`
/// are set to `null`; arrays and scalars are replaced whole.
pub fn merge_patch(before: &Value, after: &Value) -> Value {
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => {
            let mut patch = Map::new();
            for (key, value) in a {
                match b.get(key) {
                    Some(old) if old == value => {}
                    Some(old) => {
                        patch.insert(key.clone(), merge_patch(old, value));
                    }
                    None => {
                        patch.insert(key.clone(), value.clone());
                    }
                }
            }
            for key in b.keys().filter(|k| !a.contains_key(*k)) {
                patch.insert(key.clone(), Value::Null);
            }
            Value::Object(patch)
        }
        (_, after) => after.clone(),
    }
}

/// Kind-agnostic reconciler of one declared kind.
pub struct Reconciler<K: Reconcilable> {
    lister: Lister<K>,
    builder: Arc<dyn AdapterBuilder<K>>,
    subscription: Option<Arc<dyn SubscriptionReconciler<K>>>,
    workloads: WorkloadReconciler,
    sinks: SinkResolver,
    finalizers: FinalizerManager,
    objects: Arc<dyn ObjectClient>,
    ctx: ReconcileContext,
    backoff_base_seconds: u64,
    backoff_max_seconds: u64,
    /// Error count tracking per key (namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl<K: Reconcilable> std::fmt::Debug for Reconciler<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("kind", &K::kind(&()))
            .field("subscriptions", &self.subscription.is_some())
            .finish_non_exhaustive()
    }
}

impl<K: Reconcilable> Reconciler<K> {
    pub fn new(
        lister: Lister<K>,
        builder: Arc<dyn AdapterBuilder<K>>,
        cluster: Arc<dyn ClusterClient>,
        objects: Arc<dyn ObjectClient>,
        recorder: Arc<dyn EventRecorder>,
        shutdown: ShutdownSignal,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            lister,
            builder,
            subscription: None,
            workloads: WorkloadReconciler::new(cluster.clone()),
            sinks: SinkResolver::new(cluster),
            finalizers: FinalizerManager::new(objects.clone(), recorder.clone()),
            objects,
            ctx: ReconcileContext { recorder, shutdown },
            backoff_base_seconds: config.backoff_base_seconds,
            backoff_max_seconds: config.backoff_max_seconds,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Enables finalizers and subscription reconciliation for the kind.
    pub fn with_subscriptions(mut self, subscription: Arc<dyn SubscriptionReconciler<K>>) -> Self {
        self.subscription = Some(subscription);
        self
    }

    /// Reconciles the object `namespace/name` as currently cached.
    #[instrument(skip(self), fields(kind = %K::kind(&())))]
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<Action, ControllerError> {
        let key = object_key(namespace, name);
        let Some(cached) = self.lister.get(namespace, name) else {
            debug!("{} {} no longer exists", K::kind(&()), key);
            self.forget(&key);
            return Ok(Action::await_change());
        };
        let mut obj = (*cached).clone();

        if obj.meta().deletion_timestamp.is_some() {
            return self.finalize(&key, &obj).await;
        }

        if self.subscription.is_some() && self.finalizers.ensure(&obj).await? {
            return Ok(Action::requeue(FINALIZER_REQUEUE));
        }

        let before = serde_json::to_value(obj.status())?;
        let result = self.reconcile_kind(&mut obj).await;
        if let Err(ControllerError::Cancelled) = result {
            info!("Reconcile of {} cancelled by shutdown", key);
            return Err(ControllerError::Cancelled);
        }

        let generation = obj.meta().generation;
        StatusManager::new(obj.source_status_mut(), K::CONDITIONS).set_observed_generation(generation);
        let written = self.write_status(&obj, &before).await;

        if let Err(e) = &result {
            if e.class() == ErrorClass::Programmer {
                error!("Internal error reconciling {}: {}", key, e);
                self.ctx
                    .recorder
                    .record(&obj.object_ref(&()), RecordedEvent::warning(reasons::INTERNAL_ERROR, e.to_string()))
                    .await;
            }
        }
        result?;
        written?;

        self.reset_error(&key);
        Ok(Action::await_change())
    }

    async fn reconcile_kind(&self, obj: &mut K) -> Result<(), ControllerError> {
        let namespace = obj.namespace().unwrap_or_default();

        let sink_uri = match self.sinks.resolve(&namespace, obj.sink()).await {
            Ok(uri) => uri,
            Err(e) => {
                warn!("Cannot resolve the sink of {}/{}: {}", namespace, obj.name_any(), e);
                StatusManager::new(obj.source_status_mut(), K::CONDITIONS).mark_sink_warn(e.reason(), &e.to_string());
                return Err(e.into());
            }
        };
        StatusManager::new(obj.source_status_mut(), K::CONDITIONS).mark_sink(&sink_uri);

        self.reconcile_adapter(obj, &sink_uri).await?;

        if let Some(subscription) = &self.subscription {
            subscription.reconcile(obj, &self.ctx).await?;
        }
        Ok(())
    }

    async fn reconcile_adapter(&self, obj: &mut K, sink_uri: &str) -> Result<(), ControllerError> {
        let (desired, outcome) = match self.apply_adapter(obj, sink_uri).await {
            Ok(ok) => ok,
            Err(e) if e.class() == ErrorClass::Transient => return Err(e),
            Err(e) => {
                let message = format!("Failed to reconcile adapter: {}", e);
                warn!("{}/{}: {}", obj.namespace().unwrap_or_default(), obj.name_any(), message);
                let changed = StatusManager::new(obj.source_status_mut(), K::CONDITIONS)
                    .mark_deployment_failed(reasons::FAILED_ADAPTER, &message);
                if changed {
                    self.ctx
                        .recorder
                        .record(&obj.object_ref(&()), RecordedEvent::warning(reasons::FAILED_ADAPTER, message))
                        .await;
                }
                return Err(e);
            }
        };

        StatusManager::new(obj.source_status_mut(), K::CONDITIONS)
            .propagate_deployment_availability(Some(outcome.workload()));

        let event = match outcome {
            WorkloadOutcome::Created(_) => Some((reasons::ADAPTER_CREATED, "Created")),
            WorkloadOutcome::Updated(_) => Some((reasons::ADAPTER_UPDATED, "Updated")),
            WorkloadOutcome::Unchanged(_) => None,
        };
        if let Some((reason, verb)) = event {
            self.ctx
                .recorder
                .record(
                    &obj.object_ref(&()),
                    RecordedEvent::normal(reason, format!("{} adapter {} {:?}", verb, desired.kind, desired.name)),
                )
                .await;
        }
        Ok(())
    }

    async fn apply_adapter(&self, obj: &K, sink_uri: &str) -> Result<(WorkloadSpec, WorkloadOutcome), ControllerError> {
        let desired = self.builder.build_adapter(obj, sink_uri)?;
        self.workloads.ensure_rbac(obj, desired.kind).await?;
        let outcome = self.workloads.reconcile(&desired).await?;
        Ok((desired, outcome))
    }

    /// Runs the kind's cleanup, then lets the deletion proceed.
    async fn finalize(&self, key: &str, obj: &K) -> Result<Action, ControllerError> {
        let Some(subscription) = &self.subscription else {
            return Ok(Action::await_change());
        };
        if !has_finalizer(obj) {
            warn!("{} is being deleted without finalizer {}, skipping cleanup", key, K::finalizer_name());
            self.ctx
                .recorder
                .record(
                    &obj.object_ref(&()),
                    RecordedEvent::warning(
                        reasons::FINALIZER_MISSING,
                        format!("Finalizer {:?} is not set, skipping cleanup", K::finalizer_name()),
                    ),
                )
                .await;
            return Ok(Action::await_change());
        }

        match subscription.finalize(obj, &self.ctx).await {
            Ok(()) => {}
            Err(ControllerError::Cancelled) => return Err(ControllerError::Cancelled),
            Err(e) => {
                // Deletion must eventually go through, whatever the error class
                warn!("Cleanup of {} failed: {}", key, e);
                let message = format!("Failed to clean up: {}", e);
                let mut failed = obj.clone();
                let before = serde_json::to_value(failed.status())?;
                let changed = StatusManager::new(failed.source_status_mut(), K::CONDITIONS)
                    .mark_not_subscribed(reasons::FAILED_UNSUBSCRIBE, &message);
                if changed {
                    self.ctx
                        .recorder
                        .record(&failed.object_ref(&()), RecordedEvent::warning(reasons::FAILED_UNSUBSCRIBE, message))
                        .await;
                }
                if let Err(e) = self.write_status(&failed, &before).await {
                    warn!("Failed to record the cleanup failure of {}: {}", key, e);
                }
                return Ok(self.backoff_action(key));
            }
        }

        self.finalizers.release(obj).await?;
        self.forget(key);
        Ok(Action::await_change())
    }

    async fn write_status(&self, obj: &K, before: &Value) -> Result<(), ControllerError> {
        let after = serde_json::to_value(obj.status())?;
        if after == *before {
            debug!("Status of {}/{} is up to date", obj.namespace().unwrap_or_default(), obj.name_any());
            return Ok(());
        }
        let patch = json!({ "status": merge_patch(before, &after) });
        self.objects
            .patch_status(&obj.namespace().unwrap_or_default(), &obj.name_any(), &patch)
            .await
    }

    /// Records a panic caught while reconciling `obj`.
    pub async fn record_panic(&self, obj: &K, message: &str) {
        self.ctx
            .recorder
            .record(
                &obj.object_ref(&()),
                RecordedEvent::warning(reasons::INTERNAL_ERROR, format!("Reconcile panicked: {}", message)),
            )
            .await;
    }

    /// Requeue strategy after a failed reconcile of `key`.
    pub fn error_action(&self, key: &str, error: &ControllerError) -> Action {
        match error.class() {
            ErrorClass::PermanentConfig | ErrorClass::NotFound => {
                info!("Not retrying {} until it changes: {}", key, error);
                Action::await_change()
            }
            ErrorClass::Transient | ErrorClass::Programmer => self.backoff_action(key),
        }
    }

    fn backoff_action(&self, key: &str) -> Action {
        let (seconds, error_count) = match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(key.to_string())
                    .or_insert_with(|| BackoffState::new(self.backoff_base_seconds, self.backoff_max_seconds));
                state.increment_error();
                (state.backoff.next_backoff_seconds(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using base backoff", e);
                (self.backoff_base_seconds, 0)
            }
        };
        debug!("Retrying {} in {}s (consecutive errors: {})", key, seconds, error_count);
        Action::requeue(Duration::from_secs(seconds))
    }

    /// Reset error count for a key after a successful reconcile
    pub fn reset_error(&self, key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(key) {
                state.reset();
            }
        }
    }

    fn forget(&self, key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(key);
        }
    }
}
