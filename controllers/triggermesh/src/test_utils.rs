//! Test utilities for unit testing reconcilers
//!
//! Fixtures of the declared kinds, an in-memory cluster, and recorders that
//! capture what the reconcilers write.

use crate::cluster::{ClusterClient, ObjectClient, ObservedWorkload, WorkloadAvailability};
use crate::error::ControllerError;
use crate::events::{EventKind, EventRecorder, RecordedEvent};
use crate::lister::Lister;
use crate::reconciler::adapter::{WorkloadKind, WorkloadSpec};
use crate::reconciler::sources::{AzureClients, ClientGetter};
use async_trait::async_trait;
use crds::{
    AzureAuth, AzureEventGridSource, AzureEventGridSourceEndpoint, AzureEventGridSourceSpec, AzureEventHubsEndpoint,
    AzureServicePrincipal, ConditionStatus, DataWeaveTransformation, DataWeaveTransformationSpec, Destination,
    KReference, Reconcilable, ValueFromField,
};
use eventgrid_client::{MockEventHubsClient, MockEventSubscriptionsClient};
use k8s_openapi::api::core::v1::{ObjectReference, ServiceAccount};
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::runtime::{reflector, watcher};
use kube::ResourceExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const TEST_SCOPE: &str =
    "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/MyGroup/providers/Microsoft.Storage/storageAccounts/mystorageaccount";
pub const TEST_EVENT_HUBS_NAMESPACE: &str =
    "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/MyGroup/providers/Microsoft.EventHub/namespaces/MyNamespace";
pub const TEST_SINK_URI: &str = "http://default.default.svc.example.com/";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Kubernetes API error with the given status code
pub fn kube_api_error(code: u16) -> ControllerError {
    ControllerError::Kube(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("injected status {}", code),
        reason: "Test".to_string(),
        code,
    }))
}

/// DataWeaveTransformation with a literal spell and a URI sink.
pub fn new_dataweave_transformation(namespace: &str, name: &str) -> DataWeaveTransformation {
    let mut trn = DataWeaveTransformation::new(
        name,
        DataWeaveTransformationSpec {
            dw_spell: ValueFromField::literal("%dw 2.0\noutput application/json\n---\npayload"),
            incoming_content_type: "application/json".to_string(),
            output_content_type: "application/json".to_string(),
            sink: Destination::from_uri(TEST_SINK_URI),
            adapter_overrides: None,
        },
    );
    trn.metadata.namespace = Some(namespace.to_string());
    trn.metadata.uid = Some(format!("uid-{}-{}", namespace, name));
    trn.metadata.generation = Some(1);
    trn
}

/// AzureEventGridSource with a declared Event Hub, literal credentials and
/// its finalizer already set.
pub fn new_azure_event_grid_source(namespace: &str, name: &str) -> AzureEventGridSource {
    let mut src = AzureEventGridSource::new(
        name,
        AzureEventGridSourceSpec {
            scope: TEST_SCOPE.to_string(),
            event_types: Some(vec![
                "Microsoft.Storage.BlobCreated".to_string(),
                "Microsoft.Storage.BlobDeleted".to_string(),
            ]),
            endpoint: AzureEventGridSourceEndpoint {
                event_hubs: AzureEventHubsEndpoint {
                    namespace_id: TEST_EVENT_HUBS_NAMESPACE.to_string(),
                    hub_name: Some("MyEventHub".to_string()),
                },
            },
            auth: AzureAuth {
                service_principal: Some(AzureServicePrincipal {
                    tenant_id: ValueFromField::literal("00000000-0000-0000-0000-000000000000"),
                    client_id: ValueFromField::literal("00000000-0000-0000-0000-000000000000"),
                    client_secret: ValueFromField::literal("some_secret"),
                }),
            },
            sink: Destination::from_uri(TEST_SINK_URI),
            adapter_overrides: None,
        },
    );
    src.metadata.namespace = Some(namespace.to_string());
    src.metadata.uid = Some(format!("uid-{}-{}", namespace, name));
    src.metadata.generation = Some(1);
    src.metadata.finalizers = Some(vec![AzureEventGridSource::finalizer_name()]);
    src
}

/// Lister over a store pre-filled with `objects`.
pub fn lister_with<K: Reconcilable>(objects: Vec<K>) -> Lister<K> {
    let (reader, mut writer) = reflector::store();
    for obj in objects {
        writer.apply_watcher_event(&watcher::Event::Apply(obj));
    }
    Lister::new(reader)
}

/// Projection of `spec` as the cluster would report it back.
pub fn observed_from_spec(spec: &WorkloadSpec, availability: Option<WorkloadAvailability>) -> ObservedWorkload {
    ObservedWorkload {
        image: Some(spec.image.clone()),
        env: spec.env.clone(),
        labels: spec.labels.clone(),
        selector: spec.selector.clone(),
        service_account: spec.service_account.clone(),
        availability,
    }
}

pub fn available() -> WorkloadAvailability {
    WorkloadAvailability {
        status: ConditionStatus::True,
        reason: None,
        message: None,
    }
}

type WorkloadKey = (WorkloadKind, String, String);

/// In-memory `ClusterClient`.
#[derive(Default)]
pub struct FakeCluster {
    workloads: Mutex<HashMap<WorkloadKey, ObservedWorkload>>,
    service_accounts: Mutex<HashMap<(String, String), ServiceAccount>>,
    role_bindings: Mutex<HashMap<(String, String), RoleBinding>>,
    secrets: Mutex<HashMap<(String, String, String), String>>,
    addressables: Mutex<HashMap<(String, String, String, String), Value>>,
    /// Availability reported by workloads the fake creates or updates
    availability: Mutex<Option<WorkloadAvailability>>,
    fail_workloads_with: Mutex<Option<u16>>,
    workload_creates: AtomicUsize,
    workload_updates: AtomicUsize,
    service_account_creates: AtomicUsize,
    service_account_updates: AtomicUsize,
    role_binding_creates: AtomicUsize,
    role_binding_updates: AtomicUsize,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_addressable(&self, namespace: &str, reference: &KReference, obj: Value) {
        lock(&self.addressables).insert(
            (
                namespace.to_string(),
                reference.api_version.clone(),
                reference.kind.clone(),
                reference.name.clone(),
            ),
            obj,
        );
    }

    pub fn add_secret(&self, namespace: &str, name: &str, key: &str, value: &str) {
        lock(&self.secrets).insert((namespace.to_string(), name.to_string(), key.to_string()), value.to_string());
    }

    pub fn seed_workload(&self, spec: &WorkloadSpec, observed: ObservedWorkload) {
        lock(&self.workloads).insert((spec.kind, spec.namespace.clone(), spec.name.clone()), observed);
    }

    pub fn seed_service_account(&self, sa: ServiceAccount) {
        let key = (sa.namespace().unwrap_or_default(), sa.name_any());
        lock(&self.service_accounts).insert(key, sa);
    }

    pub fn seed_role_binding(&self, rb: RoleBinding) {
        let key = (rb.namespace().unwrap_or_default(), rb.name_any());
        lock(&self.role_bindings).insert(key, rb);
    }

    pub fn set_availability(&self, availability: Option<WorkloadAvailability>) {
        *lock(&self.availability) = availability;
    }

    /// Make every workload call fail with a Kubernetes API error
    pub fn fail_workloads_with(&self, code: Option<u16>) {
        *lock(&self.fail_workloads_with) = code;
    }

    pub fn workload(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Option<ObservedWorkload> {
        lock(&self.workloads)
            .get(&(kind, namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn service_account(&self, namespace: &str, name: &str) -> Option<ServiceAccount> {
        lock(&self.service_accounts)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn role_binding(&self, namespace: &str, name: &str) -> Option<RoleBinding> {
        lock(&self.role_bindings)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn workload_creates(&self) -> usize {
        self.workload_creates.load(Ordering::SeqCst)
    }

    pub fn workload_updates(&self) -> usize {
        self.workload_updates.load(Ordering::SeqCst)
    }

    pub fn service_account_creates(&self) -> usize {
        self.service_account_creates.load(Ordering::SeqCst)
    }

    pub fn service_account_updates(&self) -> usize {
        self.service_account_updates.load(Ordering::SeqCst)
    }

    pub fn role_binding_creates(&self) -> usize {
        self.role_binding_creates.load(Ordering::SeqCst)
    }

    pub fn role_binding_updates(&self) -> usize {
        self.role_binding_updates.load(Ordering::SeqCst)
    }

    fn injected(&self) -> Result<(), ControllerError> {
        match *lock(&self.fail_workloads_with) {
            Some(code) => Err(kube_api_error(code)),
            None => Ok(()),
        }
    }

    fn store_workload(&self, spec: &WorkloadSpec) -> ObservedWorkload {
        let observed = observed_from_spec(spec, lock(&self.availability).clone());
        self.seed_workload(spec, observed.clone());
        observed
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get_workload(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObservedWorkload>, ControllerError> {
        self.injected()?;
        Ok(self.workload(kind, namespace, name))
    }

    async fn create_workload(&self, spec: &WorkloadSpec) -> Result<ObservedWorkload, ControllerError> {
        self.injected()?;
        self.workload_creates.fetch_add(1, Ordering::SeqCst);
        Ok(self.store_workload(spec))
    }

    async fn update_workload(&self, spec: &WorkloadSpec) -> Result<ObservedWorkload, ControllerError> {
        self.injected()?;
        self.workload_updates.fetch_add(1, Ordering::SeqCst);
        Ok(self.store_workload(spec))
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>, ControllerError> {
        Ok(self.service_account(namespace, name))
    }

    async fn create_service_account(&self, sa: &ServiceAccount) -> Result<ServiceAccount, ControllerError> {
        self.service_account_creates.fetch_add(1, Ordering::SeqCst);
        let mut created = sa.clone();
        created.metadata.uid = Some(format!("uid-sa-{}", sa.name_any()));
        self.seed_service_account(created.clone());
        Ok(created)
    }

    async fn update_service_account(&self, sa: &ServiceAccount) -> Result<ServiceAccount, ControllerError> {
        self.service_account_updates.fetch_add(1, Ordering::SeqCst);
        self.seed_service_account(sa.clone());
        Ok(sa.clone())
    }

    async fn get_role_binding(&self, namespace: &str, name: &str) -> Result<Option<RoleBinding>, ControllerError> {
        Ok(self.role_binding(namespace, name))
    }

    async fn create_role_binding(&self, rb: &RoleBinding) -> Result<RoleBinding, ControllerError> {
        self.role_binding_creates.fetch_add(1, Ordering::SeqCst);
        self.seed_role_binding(rb.clone());
        Ok(rb.clone())
    }

    async fn update_role_binding(&self, rb: &RoleBinding) -> Result<RoleBinding, ControllerError> {
        self.role_binding_updates.fetch_add(1, Ordering::SeqCst);
        self.seed_role_binding(rb.clone());
        Ok(rb.clone())
    }

    async fn get_secret_value(&self, namespace: &str, name: &str, key: &str) -> Result<String, ControllerError> {
        lock(&self.secrets)
            .get(&(namespace.to_string(), name.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ControllerError::SecretNotFound(format!("{}/{} has no key {:?}", namespace, name, key)))
    }

    async fn get_addressable(
        &self,
        namespace: &str,
        reference: &KReference,
    ) -> Result<Option<Value>, ControllerError> {
        Ok(lock(&self.addressables)
            .get(&(
                namespace.to_string(),
                reference.api_version.clone(),
                reference.kind.clone(),
                reference.name.clone(),
            ))
            .cloned())
    }
}

/// `ObjectClient` recording every patch as `(namespace/name, body)`.
#[derive(Default)]
pub struct FakeObjectClient {
    metadata_patches: Mutex<Vec<(String, Value)>>,
    status_patches: Mutex<Vec<(String, Value)>>,
}

impl FakeObjectClient {
    pub fn metadata_patches(&self) -> Vec<(String, Value)> {
        lock(&self.metadata_patches).clone()
    }

    pub fn status_patches(&self) -> Vec<(String, Value)> {
        lock(&self.status_patches).clone()
    }
}

#[async_trait]
impl ObjectClient for FakeObjectClient {
    async fn patch_metadata(&self, namespace: &str, name: &str, patch: &Value) -> Result<(), ControllerError> {
        lock(&self.metadata_patches).push((format!("{}/{}", namespace, name), patch.clone()));
        Ok(())
    }

    async fn patch_status(&self, namespace: &str, name: &str, patch: &Value) -> Result<(), ControllerError> {
        lock(&self.status_patches).push((format!("{}/{}", namespace, name), patch.clone()));
        Ok(())
    }
}

/// `EventRecorder` keeping events as `"<Type> <Reason> <Message>"`.
#[derive(Default)]
pub struct FakeRecorder {
    events: Mutex<Vec<String>>,
}

impl FakeRecorder {
    pub fn events(&self) -> Vec<String> {
        lock(&self.events).clone()
    }
}

#[async_trait]
impl EventRecorder for FakeRecorder {
    async fn record(&self, _object: &ObjectReference, event: RecordedEvent) {
        let kind = match event.kind {
            EventKind::Normal => "Normal",
            EventKind::Warning => "Warning",
        };
        lock(&self.events).push(format!("{} {} {}", kind, event.reason, event.message));
    }
}

/// `ClientGetter` handing out shared mock ARM clients.
#[derive(Clone, Default)]
pub struct MockClientGetter {
    pub subscriptions: MockEventSubscriptionsClient,
    pub event_hubs: MockEventHubsClient,
    error: Option<String>,
}

impl MockClientGetter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Getter failing as if the credentials were invalid
    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ClientGetter for MockClientGetter {
    async fn get(&self, _src: &AzureEventGridSource) -> Result<AzureClients, ControllerError> {
        if let Some(message) = &self.error {
            return Err(ControllerError::InvalidConfig(message.clone()));
        }
        Ok(AzureClients {
            subscriptions: Arc::new(self.subscriptions.clone()),
            event_hubs: Arc::new(self.event_hubs.clone()),
        })
    }
}
