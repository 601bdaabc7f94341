//! AzureEventGridSource CRD
//!
//! Subscribes to events of an Azure resource through an Event Grid event
//! subscription delivering into an Event Hub, from which the receive adapter
//! reads and forwards CloudEvents to the sink.

use crate::common::{
    AdapterOverrides, AzureResourceId, Condition, Destination, ResourceIdError, SourceStatus, ValueFromField,
    CONDITION_DEPLOYMENT_AVAILABLE, CONDITION_SINK_PROVIDED, CONDITION_SUBSCRIBED,
};
use crate::reconcilable::Reconcilable;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "sources.triggermesh.io",
    version = "v1alpha1",
    kind = "AzureEventGridSource",
    plural = "azureeventgridsources",
    namespaced,
    status = "AzureEventGridSourceStatus",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Sink","type":"string","jsonPath":".status.sinkUri"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AzureEventGridSourceSpec {
    /// Resource ID of the Azure resource (or resource group, or subscription)
    /// to subscribe to. Parsed by the controller, so a malformed ID only
    /// affects this object.
    pub scope: String,

    /// Event types to subscribe to (all event types when omitted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,

    /// Where Event Grid delivers the events
    pub endpoint: AzureEventGridSourceEndpoint,

    /// Credentials used to manage the subscription and read from Event Hubs
    pub auth: AzureAuth,

    /// Destination of the CloudEvents produced by the source
    pub sink: Destination,

    /// Extra settings for the receive adapter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_overrides: Option<AdapterOverrides>,
}

/// Intermediate destination of the events
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AzureEventGridSourceEndpoint {
    /// Event Hubs endpoint
    pub event_hubs: AzureEventHubsEndpoint,
}

/// Event Hubs namespace and optional hub receiving the events
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AzureEventHubsEndpoint {
    /// Resource ID of the Event Hubs namespace
    #[serde(rename = "namespaceID")]
    pub namespace_id: String,

    /// Name of an existing Event Hub. When omitted, the controller manages a
    /// dedicated Event Hub inside the namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_name: Option<String>,
}

/// Authentication method for Azure
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AzureAuth {
    /// Service principal (Entra ID application) credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_principal: Option<AzureServicePrincipal>,
}

/// Credentials of an Azure service principal
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AzureServicePrincipal {
    /// Directory (tenant) ID
    #[serde(rename = "tenantID")]
    pub tenant_id: ValueFromField,

    /// Application (client) ID
    #[serde(rename = "clientID")]
    pub client_id: ValueFromField,

    /// Client secret
    pub client_secret: ValueFromField,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AzureEventGridSourceStatus {
    #[serde(flatten)]
    pub source: SourceStatus,

    /// Resource ID of the Event Grid event subscription, once confirmed
    #[serde(rename = "eventSubscriptionID", default, skip_serializing_if = "Option::is_none")]
    pub event_subscription_id: Option<String>,

    /// Resource ID of the Event Hub events are delivered to
    #[serde(rename = "eventHubID", default, skip_serializing_if = "Option::is_none")]
    pub event_hub_id: Option<String>,
}

impl AzureEventGridSource {
    /// Event types the subscription filters on; empty means every type.
    pub fn event_types(&self) -> &[String] {
        self.spec.event_types.as_deref().unwrap_or_default()
    }

    /// Parsed `spec.scope`.
    pub fn scope_id(&self) -> Result<AzureResourceId, ResourceIdError> {
        self.spec.scope.parse()
    }

    /// Parsed `spec.endpoint.eventHubs.namespaceID`.
    pub fn event_hubs_namespace_id(&self) -> Result<AzureResourceId, ResourceIdError> {
        self.spec.endpoint.event_hubs.namespace_id.parse()
    }
}

impl Reconcilable for AzureEventGridSource {
    type Status = AzureEventGridSourceStatus;

    const CONDITIONS: &'static [&'static str] = &[
        CONDITION_SINK_PROVIDED,
        CONDITION_DEPLOYMENT_AVAILABLE,
        CONDITION_SUBSCRIBED,
    ];

    fn sink(&self) -> &Destination {
        &self.spec.sink
    }

    fn adapter_overrides(&self) -> Option<&AdapterOverrides> {
        self.spec.adapter_overrides.as_ref()
    }

    fn status(&self) -> Option<&Self::Status> {
        self.status.as_ref()
    }

    fn status_mut(&mut self) -> &mut Self::Status {
        self.status.get_or_insert_with(Default::default)
    }

    fn source_status(&self) -> Option<&SourceStatus> {
        self.status.as_ref().map(|s| &s.source)
    }

    fn source_status_mut(&mut self) -> &mut SourceStatus {
        &mut self.status_mut().source
    }
}

impl AzureEventGridSourceStatus {
    /// Looks up a condition by type.
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.source.condition(type_)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_manifest() {
        let src: AzureEventGridSource = serde_json::from_value(serde_json::json!({
            "apiVersion": "sources.triggermesh.io/v1alpha1",
            "kind": "AzureEventGridSource",
            "metadata": {"name": "test", "namespace": "testns"},
            "spec": {
                "scope": "/subscriptions/s/resourceGroups/MyGroup/providers/Microsoft.Storage/storageAccounts/acct",
                "eventTypes": ["Microsoft.Storage.BlobCreated"],
                "endpoint": {"eventHubs": {
                    "namespaceID": "/subscriptions/s/resourceGroups/MyGroup/providers/Microsoft.EventHub/namespaces/MyNamespace",
                    "hubName": "MyEventHub"
                }},
                "auth": {"servicePrincipal": {
                    "tenantID": {"value": "t"},
                    "clientID": {"value": "c"},
                    "clientSecret": {"valueFromSecret": {"name": "azure", "key": "secret"}}
                }},
                "sink": {"ref": {"apiVersion": "eventing.knative.dev/v1", "kind": "Broker", "name": "default"}}
            }
        }))
        .unwrap();

        assert_eq!(src.event_types(), ["Microsoft.Storage.BlobCreated".to_string()]);
        assert_eq!(src.scope_id().unwrap().resource_name(), Some("acct"));
        assert_eq!(src.event_hubs_namespace_id().unwrap().resource_name(), Some("MyNamespace"));
    }

    fn manifest(name: &str, scope: &str) -> serde_json::Value {
        serde_json::json!({
            "apiVersion": "sources.triggermesh.io/v1alpha1",
            "kind": "AzureEventGridSource",
            "metadata": {"name": name, "namespace": "testns"},
            "spec": {
                "scope": scope,
                "endpoint": {"eventHubs": {"namespaceID": "/subscriptions/s/resourceGroups/g/providers/Microsoft.EventHub/namespaces/n"}},
                "auth": {},
                "sink": {"uri": "http://sink/"}
            }
        })
    }

    #[test]
    fn test_malformed_scope_does_not_break_list_decoding() {
        let list: kube::core::ObjectList<AzureEventGridSource> = serde_json::from_value(serde_json::json!({
            "apiVersion": "sources.triggermesh.io/v1alpha1",
            "kind": "AzureEventGridSourceList",
            "metadata": {"resourceVersion": "1"},
            "items": [
                manifest("good", "/subscriptions/s/resourceGroups/g"),
                manifest("bad", "subscriptions/s/resourceGroups/g"),
            ]
        }))
        .unwrap();

        assert_eq!(list.items.len(), 2);
        assert!(list.items[0].scope_id().is_ok());
        assert!(matches!(
            list.items[1].scope_id(),
            Err(ResourceIdError::MissingSubscription(_))
        ));
    }

    #[test]
    fn test_status_field_names() {
        let status = AzureEventGridSourceStatus {
            source: SourceStatus {
                observed_generation: Some(3),
                conditions: vec![],
                sink_uri: Some("http://sink/".to_string()),
            },
            event_subscription_id: Some("/subscriptions/s/x".to_string()),
            event_hub_id: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["observedGeneration"], 3);
        assert_eq!(json["sinkUri"], "http://sink/");
        assert_eq!(json["eventSubscriptionID"], "/subscriptions/s/x");
        assert!(json.get("eventHubID").is_none());
    }
}
