//! Rendering of adapter workloads and RBAC objects, and projection of live
//! workloads back onto the fields the controller owns.

use crate::cluster::{ObservedWorkload, WorkloadAvailability};
use crate::reconciler::adapter::{WorkloadSpec, ADAPTER_CONTAINER};
use crds::ConditionStatus;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec, ServiceAccount};
use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::core::{ApiResource, GroupVersionKind};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// `serving.knative.dev/v1` Service
pub fn knative_service_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("serving.knative.dev", "v1", "Service"),
        "services",
    )
}

fn condition_status(status: &str) -> ConditionStatus {
    match status {
        "True" => ConditionStatus::True,
        "False" => ConditionStatus::False,
        _ => ConditionStatus::Unknown,
    }
}

fn adapter_container(spec: &WorkloadSpec) -> Container {
    Container {
        name: ADAPTER_CONTAINER.to_string(),
        image: Some(spec.image.clone()),
        env: Some(spec.env.clone()),
        ..Default::default()
    }
}

pub fn render_deployment(spec: &WorkloadSpec) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.namespace.clone()),
            labels: Some(spec.labels.clone()),
            owner_references: Some(vec![spec.owner.clone()]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            selector: LabelSelector {
                match_labels: Some(spec.selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(spec.labels.clone()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: spec.service_account.clone(),
                    containers: vec![adapter_container(spec)],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

pub fn observe_deployment(deployment: &Deployment) -> ObservedWorkload {
    let spec = deployment.spec.as_ref();
    let pod = spec.and_then(|s| s.template.spec.as_ref());
    let container = pod.and_then(|p| {
        p.containers
            .iter()
            .find(|c| c.name == ADAPTER_CONTAINER)
            .or_else(|| p.containers.first())
    });

    let availability = deployment
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conds| conds.iter().find(|c| c.type_ == "Available"))
        .map(|c| WorkloadAvailability {
            status: condition_status(&c.status),
            reason: c.reason.clone(),
            message: c.message.clone(),
        });

    ObservedWorkload {
        image: container.and_then(|c| c.image.clone()),
        env: container.and_then(|c| c.env.clone()).unwrap_or_default(),
        labels: deployment.metadata.labels.clone().unwrap_or_default(),
        selector: spec
            .and_then(|s| s.selector.match_labels.clone())
            .unwrap_or_default(),
        service_account: pod.and_then(|p| p.service_account_name.clone()),
        availability,
    }
}

pub fn render_knative_service(spec: &WorkloadSpec) -> Value {
    json!({
        "apiVersion": "serving.knative.dev/v1",
        "kind": "Service",
        "metadata": {
            "name": spec.name,
            "namespace": spec.namespace,
            "labels": spec.labels,
            "ownerReferences": [spec.owner],
        },
        "spec": {
            "template": {
                "metadata": {"labels": spec.labels},
                "spec": {"containers": [adapter_container(spec)]},
            }
        }
    })
}

pub fn observe_knative_service(ksvc: &Value) -> ObservedWorkload {
    let containers = ksvc
        .pointer("/spec/template/spec/containers")
        .and_then(Value::as_array);
    let container = containers.and_then(|cs| {
        cs.iter()
            .find(|c| c.get("name").and_then(Value::as_str) == Some(ADAPTER_CONTAINER))
            .or_else(|| cs.first())
    });

    let env = container
        .and_then(|c| c.get("env"))
        .and_then(|e| serde_json::from_value::<Vec<EnvVar>>(e.clone()).ok())
        .unwrap_or_default();
    let labels = ksvc
        .pointer("/metadata/labels")
        .and_then(|l| serde_json::from_value::<BTreeMap<String, String>>(l.clone()).ok())
        .unwrap_or_default();

    let availability = ksvc
        .pointer("/status/conditions")
        .and_then(Value::as_array)
        .and_then(|conds| {
            conds
                .iter()
                .find(|c| c.get("type").and_then(Value::as_str) == Some("Ready"))
        })
        .map(|c| WorkloadAvailability {
            status: condition_status(c.get("status").and_then(Value::as_str).unwrap_or_default()),
            reason: c.get("reason").and_then(Value::as_str).map(str::to_string),
            message: c.get("message").and_then(Value::as_str).map(str::to_string),
        });

    ObservedWorkload {
        image: container
            .and_then(|c| c.get("image"))
            .and_then(Value::as_str)
            .map(str::to_string),
        env,
        labels,
        selector: BTreeMap::new(),
        service_account: None,
        availability,
    }
}

pub fn render_service_account(
    namespace: &str,
    name: &str,
    labels: BTreeMap<String, String>,
    owners: Vec<OwnerReference>,
) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            owner_references: Some(owners),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Binds ServiceAccount `name` to the ClusterRole of the same name.
pub fn render_role_binding(
    namespace: &str,
    name: &str,
    labels: BTreeMap<String, String>,
    owner: OwnerReference,
) -> RoleBinding {
    RoleBinding {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: name.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
    }
}
