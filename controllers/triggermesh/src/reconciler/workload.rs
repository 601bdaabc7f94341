//! Workload reconciler.
//!
//! Makes sure the adapter workload rendered by an `AdapterBuilder` exists and
//! matches on the fields the controller owns, and, for Deployment adapters,
//! that the ServiceAccount and RoleBinding they run with exist.

use crate::cluster::{ClusterClient, ObservedWorkload};
use crate::error::ControllerError;
use crate::manifests::{render_role_binding, render_service_account};
use crate::reconciler::adapter::{selector_labels, service_account_name, WorkloadKind, WorkloadSpec};
use crds::Reconcilable;
use k8s_openapi::api::core::v1::EnvVar;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info};

/// What the reconciler had to do to the workload
#[derive(Debug, Clone, PartialEq)]
pub enum WorkloadOutcome {
    Created(ObservedWorkload),
    Updated(ObservedWorkload),
    Unchanged(ObservedWorkload),
}

impl WorkloadOutcome {
    pub fn workload(&self) -> &ObservedWorkload {
        match self {
            WorkloadOutcome::Created(w) | WorkloadOutcome::Updated(w) | WorkloadOutcome::Unchanged(w) => w,
        }
    }
}

fn sorted_env(env: &[EnvVar]) -> Vec<&EnvVar> {
    let mut sorted: Vec<&EnvVar> = env.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
}

/// Whether `current` matches `desired` on image, env (order-insensitive),
/// selector, service account and desired labels.
pub fn workload_in_sync(current: &ObservedWorkload, desired: &WorkloadSpec) -> bool {
    current.image.as_deref() == Some(desired.image.as_str())
        && sorted_env(&current.env) == sorted_env(&desired.env)
        && current.selector == desired.selector
        && current.service_account == desired.service_account
        && desired
            .labels
            .iter()
            .all(|(k, v)| current.labels.get(k) == Some(v))
}

#[derive(Clone)]
pub struct WorkloadReconciler {
    cluster: Arc<dyn ClusterClient>,
}

impl std::fmt::Debug for WorkloadReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadReconciler").finish_non_exhaustive()
    }
}

impl WorkloadReconciler {
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self { cluster }
    }

    /// Creates or updates the workload described by `desired`.
    pub async fn reconcile(&self, desired: &WorkloadSpec) -> Result<WorkloadOutcome, ControllerError> {
        let current = self
            .cluster
            .get_workload(desired.kind, &desired.namespace, &desired.name)
            .await?;

        match current {
            None => {
                info!("Creating adapter {} {}/{}", desired.kind, desired.namespace, desired.name);
                let created = self.cluster.create_workload(desired).await?;
                Ok(WorkloadOutcome::Created(created))
            }
            Some(current) if workload_in_sync(&current, desired) => {
                debug!("Adapter {}/{} is up to date", desired.namespace, desired.name);
                Ok(WorkloadOutcome::Unchanged(current))
            }
            Some(current) => {
                info!("Updating drifted adapter {} {}/{}", desired.kind, desired.namespace, desired.name);
                let mut updated = self.cluster.update_workload(desired).await?;
                // Status is not part of the patch response in every flavour
                if updated.availability.is_none() {
                    updated.availability = current.availability;
                }
                Ok(WorkloadOutcome::Updated(updated))
            }
        }
    }

    /// Ensures the ServiceAccount shared by the adapters of `K` in the
    /// object's namespace, and its RoleBinding to the kind's ClusterRole.
    pub async fn ensure_rbac<K: Reconcilable>(&self, obj: &K, kind: WorkloadKind) -> Result<(), ControllerError> {
        if kind != WorkloadKind::Deployment {
            return Ok(());
        }
        let namespace = obj.namespace().unwrap_or_default();
        let name = service_account_name::<K>();

        let owner = obj.owner_ref(&()).ok_or_else(|| {
            ControllerError::Internal(format!("{} {}/{} has no UID", K::kind(&()), namespace, obj.name_any()))
        })?;

        let sa = match self.cluster.get_service_account(&namespace, &name).await? {
            None => {
                info!("Creating ServiceAccount {}/{}", namespace, name);
                let mut labels = selector_labels(obj);
                labels.remove(crate::reconciler::adapter::LABEL_INSTANCE);
                let sa = render_service_account(&namespace, &name, labels, vec![owner]);
                self.cluster.create_service_account(&sa).await?
            }
            Some(mut sa) => {
                let owners = sa.metadata.owner_references.get_or_insert_with(Vec::new);
                if owners.iter().any(|o| o.uid == owner.uid) {
                    sa
                } else {
                    debug!("Adding owner {} to ServiceAccount {}/{}", obj.name_any(), namespace, name);
                    owners.push(owner);
                    self.cluster.update_service_account(&sa).await?
                }
            }
        };

        let sa_owner: OwnerReference = sa.controller_owner_ref(&()).ok_or_else(|| {
            ControllerError::Internal(format!("ServiceAccount {}/{} has no UID", namespace, name))
        })?;

        match self.cluster.get_role_binding(&namespace, &name).await? {
            None => {
                info!("Creating RoleBinding {}/{}", namespace, name);
                let labels = sa.metadata.labels.clone().unwrap_or_default();
                let rb = render_role_binding(&namespace, &name, labels, sa_owner);
                self.cluster.create_role_binding(&rb).await?;
            }
            Some(mut rb) => {
                let owners = rb.metadata.owner_references.get_or_insert_with(Vec::new);
                if !owners.iter().any(|o| o.uid == sa_owner.uid) {
                    owners.push(sa_owner);
                    self.cluster.update_role_binding(&rb).await?;
                }
            }
        }
        Ok(())
    }
}
