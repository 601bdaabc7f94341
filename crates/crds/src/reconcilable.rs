//! Reconcilable
//!
//! Capabilities every TriggerMesh kind exposes to the generic controller:
//! access to its sink, its adapter overrides and its status.

use crate::common::{AdapterOverrides, Destination, SourceStatus};
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A namespaced custom resource reconciled into an adapter workload
pub trait Reconcilable:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Full status type of the kind
    type Status: Serialize + Clone + PartialEq + Default + Debug + Send + Sync;

    /// Condition types contributing to `Ready`.
    const CONDITIONS: &'static [&'static str];

    fn sink(&self) -> &Destination;

    fn adapter_overrides(&self) -> Option<&AdapterOverrides>;

    fn status(&self) -> Option<&Self::Status>;

    /// Returns the status, initialising it when absent.
    fn status_mut(&mut self) -> &mut Self::Status;

    fn source_status(&self) -> Option<&SourceStatus>;

    fn source_status_mut(&mut self) -> &mut SourceStatus;

    /// Finalizer marker of the kind: `<plural>.<group>`.
    fn finalizer_name() -> String {
        format!("{}.{}", Self::plural(&()), Self::group(&()))
    }

    /// Lowercase kind, used to name adapter workloads and their RBAC objects.
    fn kind_lower() -> String {
        Self::kind(&()).to_lowercase()
    }
}
