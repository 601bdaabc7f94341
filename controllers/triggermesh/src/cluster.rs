//! Orchestrator access.
//!
//! Reconcilers talk to the Kubernetes API only through the traits in this
//! module, so their logic can be tested against in-memory fakes:
//!
//! - `ClusterClient`: adapter workloads, RBAC objects, secrets and sink
//!   targets
//! - `ObjectClient`: metadata and status patches of one declared kind

use crate::error::ControllerError;
use crate::manifests;
use crate::reconciler::adapter::{WorkloadKind, WorkloadSpec};
use async_trait::async_trait;
use crds::{ConditionStatus, KReference};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{EnvVar, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::RoleBinding;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DynamicObject, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, GroupVersionKind};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::marker::PhantomData;
use tracing::debug;

/// Readiness reported by a workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadAvailability {
    pub status: ConditionStatus,
    pub reason: Option<String>,
    pub message: Option<String>,
}

/// Projection of an existing workload onto the fields the controller owns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservedWorkload {
    pub image: Option<String>,
    pub env: Vec<EnvVar>,
    pub labels: BTreeMap<String, String>,
    pub selector: BTreeMap<String, String>,
    pub service_account: Option<String>,
    /// `Available` (Deployment) or `Ready` (Knative Service) condition
    pub availability: Option<WorkloadAvailability>,
}

/// Kubernetes operations needed to provision adapters.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get_workload(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObservedWorkload>, ControllerError>;

    async fn create_workload(&self, spec: &WorkloadSpec) -> Result<ObservedWorkload, ControllerError>;

    async fn update_workload(&self, spec: &WorkloadSpec) -> Result<ObservedWorkload, ControllerError>;

    async fn get_service_account(&self, namespace: &str, name: &str)
        -> Result<Option<ServiceAccount>, ControllerError>;

    async fn create_service_account(&self, sa: &ServiceAccount) -> Result<ServiceAccount, ControllerError>;

    async fn update_service_account(&self, sa: &ServiceAccount) -> Result<ServiceAccount, ControllerError>;

    async fn get_role_binding(&self, namespace: &str, name: &str) -> Result<Option<RoleBinding>, ControllerError>;

    async fn create_role_binding(&self, rb: &RoleBinding) -> Result<RoleBinding, ControllerError>;

    async fn update_role_binding(&self, rb: &RoleBinding) -> Result<RoleBinding, ControllerError>;

    /// Reads `key` of Secret `namespace/name`.
    async fn get_secret_value(&self, namespace: &str, name: &str, key: &str) -> Result<String, ControllerError>;

    /// Fetches the object a sink reference points to, as JSON.
    async fn get_addressable(
        &self,
        namespace: &str,
        reference: &KReference,
    ) -> Result<Option<serde_json::Value>, ControllerError>;
}

/// Patches of the declared resources of one kind.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// JSON merge patch on the main resource (finalizers).
    async fn patch_metadata(&self, namespace: &str, name: &str, patch: &serde_json::Value)
        -> Result<(), ControllerError>;

    /// JSON merge patch on the status subresource.
    async fn patch_status(&self, namespace: &str, name: &str, patch: &serde_json::Value)
        -> Result<(), ControllerError>;
}

/// `ClusterClient` backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl Debug for KubeCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCluster").finish_non_exhaustive()
    }
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn knative_services(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &manifests::knative_service_resource())
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn get_workload(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObservedWorkload>, ControllerError> {
        match kind {
            WorkloadKind::Deployment => Ok(self
                .deployments(namespace)
                .get_opt(name)
                .await?
                .map(|d| manifests::observe_deployment(&d))),
            WorkloadKind::KnativeService => match self.knative_services(namespace).get_opt(name).await? {
                Some(ksvc) => Ok(Some(manifests::observe_knative_service(&serde_json::to_value(&ksvc)?))),
                None => Ok(None),
            },
        }
    }

    async fn create_workload(&self, spec: &WorkloadSpec) -> Result<ObservedWorkload, ControllerError> {
        debug!("Creating {} {}/{}", spec.kind, spec.namespace, spec.name);
        match spec.kind {
            WorkloadKind::Deployment => {
                let created = self
                    .deployments(&spec.namespace)
                    .create(&PostParams::default(), &manifests::render_deployment(spec))
                    .await?;
                Ok(manifests::observe_deployment(&created))
            }
            WorkloadKind::KnativeService => {
                let ksvc: DynamicObject = serde_json::from_value(manifests::render_knative_service(spec))?;
                let created = self
                    .knative_services(&spec.namespace)
                    .create(&PostParams::default(), &ksvc)
                    .await?;
                Ok(manifests::observe_knative_service(&serde_json::to_value(&created)?))
            }
        }
    }

    async fn update_workload(&self, spec: &WorkloadSpec) -> Result<ObservedWorkload, ControllerError> {
        debug!("Updating {} {}/{}", spec.kind, spec.namespace, spec.name);
        let pp = PatchParams::default();
        match spec.kind {
            WorkloadKind::Deployment => {
                let patch = manifests::render_deployment(spec);
                let updated = self
                    .deployments(&spec.namespace)
                    .patch(&spec.name, &pp, &Patch::Merge(&patch))
                    .await?;
                Ok(manifests::observe_deployment(&updated))
            }
            WorkloadKind::KnativeService => {
                let patch = manifests::render_knative_service(spec);
                let updated = self
                    .knative_services(&spec.namespace)
                    .patch(&spec.name, &pp, &Patch::Merge(&patch))
                    .await?;
                Ok(manifests::observe_knative_service(&serde_json::to_value(&updated)?))
            }
        }
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>, ControllerError> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_service_account(&self, sa: &ServiceAccount) -> Result<ServiceAccount, ControllerError> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), &namespace_of(sa)?);
        Ok(api.create(&PostParams::default(), sa).await?)
    }

    async fn update_service_account(&self, sa: &ServiceAccount) -> Result<ServiceAccount, ControllerError> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), &namespace_of(sa)?);
        Ok(api.replace(&name_of(sa)?, &PostParams::default(), sa).await?)
    }

    async fn get_role_binding(&self, namespace: &str, name: &str) -> Result<Option<RoleBinding>, ControllerError> {
        let api: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_role_binding(&self, rb: &RoleBinding) -> Result<RoleBinding, ControllerError> {
        let api: Api<RoleBinding> = Api::namespaced(self.client.clone(), &namespace_of(rb)?);
        Ok(api.create(&PostParams::default(), rb).await?)
    }

    async fn update_role_binding(&self, rb: &RoleBinding) -> Result<RoleBinding, ControllerError> {
        let api: Api<RoleBinding> = Api::namespaced(self.client.clone(), &namespace_of(rb)?);
        Ok(api.replace(&name_of(rb)?, &PostParams::default(), rb).await?)
    }

    async fn get_secret_value(&self, namespace: &str, name: &str, key: &str) -> Result<String, ControllerError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get_opt(name)
            .await?
            .ok_or_else(|| ControllerError::SecretNotFound(format!("{}/{}", namespace, name)))?;
        secret_value(&secret, key)
            .ok_or_else(|| ControllerError::SecretNotFound(format!("{}/{} has no key {:?}", namespace, name, key)))
    }

    async fn get_addressable(
        &self,
        namespace: &str,
        reference: &KReference,
    ) -> Result<Option<serde_json::Value>, ControllerError> {
        let (group, version) = reference.group_version();
        let resource = ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, &reference.kind));
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &resource);
        match api.get_opt(&reference.name).await? {
            Some(obj) => Ok(Some(serde_json::to_value(&obj)?)),
            None => Ok(None),
        }
    }
}

fn namespace_of<R: Resource>(obj: &R) -> Result<String, ControllerError> {
    obj.meta()
        .namespace
        .clone()
        .ok_or_else(|| ControllerError::Internal("object without namespace".to_string()))
}

fn name_of<R: Resource>(obj: &R) -> Result<String, ControllerError> {
    obj.meta()
        .name
        .clone()
        .ok_or_else(|| ControllerError::Internal("object without name".to_string()))
}

/// Value of `key` in either `data` or `stringData` of a Secret.
pub fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    if let Some(bytes) = secret.data.as_ref().and_then(|d| d.get(key)) {
        return String::from_utf8(bytes.0.clone()).ok();
    }
    secret.string_data.as_ref().and_then(|d| d.get(key)).cloned()
}

/// `ObjectClient` for the declared kind `K`.
pub struct KubeObjectClient<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Debug for KubeObjectClient<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeObjectClient").finish_non_exhaustive()
    }
}

impl<K> KubeObjectClient<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<K> ObjectClient for KubeObjectClient<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
{
    async fn patch_metadata(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), ControllerError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.patch(name, &PatchParams::default(), &Patch::Merge(patch)).await?;
        Ok(())
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), ControllerError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(patch)).await?;
        Ok(())
    }
}
