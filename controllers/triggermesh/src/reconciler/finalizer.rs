//! Finalizer manager.
//!
//! Adds and removes the kind's finalizer marker with JSON merge patches on
//! the main resource. Patches carry the observed `resourceVersion` so that a
//! concurrent change of the finalizer list makes them fail with a conflict
//! instead of overwriting it.

use crate::cluster::ObjectClient;
use crate::error::ControllerError;
use crate::events::{reasons, EventRecorder, RecordedEvent};
use crds::Reconcilable;
use kube::{Resource, ResourceExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub fn has_finalizer<K: Reconcilable>(obj: &K) -> bool {
    let name = K::finalizer_name();
    obj.finalizers().iter().any(|f| *f == name)
}

fn finalizers_patch<K: Reconcilable>(obj: &K, finalizers: Vec<String>) -> Value {
    json!({
        "metadata": {
            "finalizers": finalizers,
            "resourceVersion": obj.resource_version().unwrap_or_default(),
        }
    })
}

/// Patch appending the kind's finalizer to the object's current list.
pub fn add_finalizer_patch<K: Reconcilable>(obj: &K) -> Value {
    let mut finalizers = obj.finalizers().to_vec();
    finalizers.push(K::finalizer_name());
    finalizers_patch(obj, finalizers)
}

/// Patch removing the kind's finalizer from the object's current list.
pub fn remove_finalizer_patch<K: Reconcilable>(obj: &K) -> Value {
    let name = K::finalizer_name();
    let finalizers = obj.finalizers().iter().filter(|f| **f != name).cloned().collect();
    finalizers_patch(obj, finalizers)
}

pub struct FinalizerManager {
    objects: Arc<dyn ObjectClient>,
    recorder: Arc<dyn EventRecorder>,
}

impl std::fmt::Debug for FinalizerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizerManager").finish_non_exhaustive()
    }
}

impl FinalizerManager {
    pub fn new(objects: Arc<dyn ObjectClient>, recorder: Arc<dyn EventRecorder>) -> Self {
        Self { objects, recorder }
    }

    /// Adds the finalizer when missing. Returns whether a patch was sent.
    pub async fn ensure<K: Reconcilable>(&self, obj: &K) -> Result<bool, ControllerError> {
        if has_finalizer(obj) {
            return Ok(false);
        }
        info!("Adding finalizer {} to {}/{}", K::finalizer_name(), obj.namespace().unwrap_or_default(), obj.name_any());
        self.patch(obj, add_finalizer_patch(obj)).await?;
        Ok(true)
    }

    /// Removes the finalizer, letting the deletion complete.
    pub async fn release<K: Reconcilable>(&self, obj: &K) -> Result<(), ControllerError> {
        info!("Removing finalizer {} from {}/{}", K::finalizer_name(), obj.namespace().unwrap_or_default(), obj.name_any());
        self.patch(obj, remove_finalizer_patch(obj)).await
    }

    async fn patch<K: Reconcilable>(&self, obj: &K, patch: Value) -> Result<(), ControllerError> {
        let namespace = obj.namespace().unwrap_or_default();
        self.objects.patch_metadata(&namespace, &obj.name_any(), &patch).await?;
        self.recorder
            .record(
                &obj.object_ref(&()),
                RecordedEvent::normal(
                    reasons::FINALIZER_UPDATE,
                    format!("Updated {:?} finalizers", obj.name_any()),
                ),
            )
            .await;
        Ok(())
    }
}
