//! Adapter builder contract.
//!
//! Each kind translates its declared spec and the resolved sink URI into a
//! `WorkloadSpec`. Builders are pure: the same object and sink always render
//! the same spec, which lets the workload reconciler detect drift by
//! comparing structures.

use crate::config::ObservabilityConfig;
use crate::error::ControllerError;
use crds::{Reconcilable, ValueFromField};
use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, SecretKeySelector};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use std::collections::BTreeMap;

pub const ENV_NAMESPACE: &str = "NAMESPACE";
pub const ENV_NAME: &str = "NAME";
pub const ENV_SINK: &str = "K_SINK";
pub const ENV_BRIDGE_ID: &str = "EVENTS_BRIDGE_IDENTIFIER";
pub const ENV_LOGGING_CONFIG: &str = "K_LOGGING_CONFIG";
pub const ENV_METRICS_CONFIG: &str = "K_METRICS_CONFIG";
pub const ENV_TRACING_CONFIG: &str = "K_TRACING_CONFIG";
pub const ENV_METRICS_DOMAIN: &str = "METRICS_DOMAIN";

/// Label carrying the identifier of the bridge a component belongs to
pub const LABEL_BRIDGE: &str = "flow.triggermesh.io/bridge";
pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
/// Keeps Knative Services off the external ingress
pub const LABEL_KSVC_VISIBILITY: &str = "networking.knative.dev/visibility";

/// Name of the adapter container in every workload
pub const ADAPTER_CONTAINER: &str = "adapter";

/// Workload flavour an adapter runs as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    /// `apps/v1` Deployment, with a dedicated ServiceAccount
    Deployment,
    /// `serving.knative.dev/v1` Service
    KnativeService,
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkloadKind::Deployment => f.write_str("Deployment"),
            WorkloadKind::KnativeService => f.write_str("Knative Service"),
        }
    }
}

/// Desired adapter workload
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadSpec {
    pub kind: WorkloadKind,
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub env: Vec<EnvVar>,
    /// Labels of the workload and of its pod template
    pub labels: BTreeMap<String, String>,
    /// Pod selector (Deployment only)
    pub selector: BTreeMap<String, String>,
    pub service_account: Option<String>,
    /// Controller reference to the declared resource
    pub owner: OwnerReference,
}

/// Per-kind translation of a declared resource into its adapter workload.
pub trait AdapterBuilder<K: Reconcilable>: Send + Sync {
    fn build_adapter(&self, obj: &K, sink_uri: &str) -> Result<WorkloadSpec, ControllerError>;
}

/// Identifier used to correlate the events of a bridge.
pub fn bridge_id<K: Reconcilable>(obj: &K) -> String {
    match obj.labels().get(LABEL_BRIDGE) {
        Some(id) if !id.is_empty() => id.clone(),
        _ => format!(
            "{}.{}.{}",
            K::plural(&()),
            obj.namespace().unwrap_or_default(),
            obj.name_any()
        ),
    }
}

/// `<kind>-<name>`
pub fn workload_name<K: Reconcilable>(obj: &K) -> String {
    format!("{}-{}", K::kind_lower(), obj.name_any())
}

/// ServiceAccount shared by the adapters of a kind within a namespace.
pub fn service_account_name<K: Reconcilable>() -> String {
    format!("{}-adapter", K::kind_lower())
}

pub fn selector_labels<K: Reconcilable>(obj: &K) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), K::kind_lower()),
        (LABEL_INSTANCE.to_string(), obj.name_any()),
    ])
}

/// Labels of the adapter workload: selector labels, common labels, then
/// user-provided overrides.
pub fn adapter_labels<K: Reconcilable>(obj: &K, kind: WorkloadKind) -> BTreeMap<String, String> {
    let mut labels = selector_labels(obj);
    labels.insert(LABEL_COMPONENT.to_string(), "adapter".to_string());
    labels.insert(LABEL_PART_OF.to_string(), "triggermesh".to_string());
    labels.insert(LABEL_MANAGED_BY.to_string(), crate::events::CONTROLLER_NAME.to_string());
    if kind == WorkloadKind::KnativeService {
        labels.insert(LABEL_KSVC_VISIBILITY.to_string(), "cluster-local".to_string());
    }
    if let Some(bridge) = obj.labels().get(LABEL_BRIDGE) {
        labels.insert(LABEL_BRIDGE.to_string(), bridge.clone());
    }
    if let Some(overrides) = obj.adapter_overrides() {
        for (k, v) in &overrides.labels {
            labels.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
    labels
}

pub fn env_value(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        value_from: None,
    }
}

/// Env var carrying either a literal value or a reference to a secret key.
pub fn value_from_env(name: &str, field: &ValueFromField) -> Result<EnvVar, ControllerError> {
    match (&field.value, &field.value_from_secret) {
        (Some(value), _) => Ok(env_value(name, value.clone())),
        (None, Some(secret)) => Ok(EnvVar {
            name: name.to_string(),
            value: None,
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: secret.name.clone().into(),
                    key: secret.key.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        }),
        (None, None) => Err(ControllerError::InvalidConfig(format!(
            "{} requires either a value or a secret reference",
            name
        ))),
    }
}

/// Assembles an adapter spec around the kind-specific variables.
///
/// Env order: owner identity, sink, bridge ID, `kind_env`, observability,
/// then user overrides (which replace variables of the same name).
pub fn new_adapter_spec<K: Reconcilable>(
    obj: &K,
    kind: WorkloadKind,
    image: &str,
    sink_uri: &str,
    kind_env: Vec<EnvVar>,
    observability: &ObservabilityConfig,
    metrics_domain: &str,
) -> Result<WorkloadSpec, ControllerError> {
    let namespace = obj.namespace().ok_or_else(|| {
        ControllerError::Internal(format!("{} {} has no namespace", K::kind(&()), obj.name_any()))
    })?;
    let owner = obj.controller_owner_ref(&()).ok_or_else(|| {
        ControllerError::Internal(format!("{} {}/{} has no UID", K::kind(&()), namespace, obj.name_any()))
    })?;

    let mut env = vec![
        env_value(ENV_NAMESPACE, namespace.clone()),
        env_value(ENV_NAME, obj.name_any()),
        env_value(ENV_SINK, sink_uri),
        env_value(ENV_BRIDGE_ID, bridge_id(obj)),
    ];
    env.extend(kind_env);

    let observability_env = [
        (ENV_LOGGING_CONFIG, &observability.logging),
        (ENV_METRICS_CONFIG, &observability.metrics),
        (ENV_TRACING_CONFIG, &observability.tracing),
    ];
    for (name, value) in observability_env {
        if let Some(value) = value {
            env.push(env_value(name, value.clone()));
        }
    }
    env.push(env_value(ENV_METRICS_DOMAIN, metrics_domain));

    if let Some(overrides) = obj.adapter_overrides() {
        for o in &overrides.env {
            match env.iter_mut().find(|e| e.name == o.name) {
                Some(existing) => *existing = env_value(&o.name, o.value.clone()),
                None => env.push(env_value(&o.name, o.value.clone())),
            }
        }
    }

    let selector = match kind {
        WorkloadKind::Deployment => selector_labels(obj),
        WorkloadKind::KnativeService => BTreeMap::new(),
    };
    let service_account = match kind {
        WorkloadKind::Deployment => Some(service_account_name::<K>()),
        WorkloadKind::KnativeService => None,
    };

    Ok(WorkloadSpec {
        kind,
        name: workload_name(obj),
        namespace,
        image: image.to_string(),
        env,
        labels: adapter_labels(obj, kind),
        selector,
        service_account,
        owner,
    })
}
