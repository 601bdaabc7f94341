//! ARM data models
//!
//! Request/response bodies of the Event Grid and Event Hubs resource
//! providers. Server-populated fields are optional so that the same types
//! serve as request bodies.

use serde::{Deserialize, Serialize};

/// API version of the `Microsoft.EventGrid` provider
pub const EVENT_GRID_API_VERSION: &str = "2022-06-15";

/// API version of the `Microsoft.EventHub` provider
pub const EVENT_HUB_API_VERSION: &str = "2021-11-01";

/// Event Grid event subscription
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventSubscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: EventSubscriptionProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventSubscriptionProperties {
    /// Where matching events are delivered. Endpoint types other than
    /// Event Hubs read as `None`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "known_destination"
    )]
    pub destination: Option<EventSubscriptionDestination>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<EventSubscriptionFilter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_delivery_schema: Option<EventDeliverySchema>,

    /// Server-populated provisioning state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// Destination of an event subscription, tagged by `endpointType`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "endpointType", content = "properties")]
pub enum EventSubscriptionDestination {
    EventHub(EventHubDestination),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventHubDestination {
    /// Resource ID of the Event Hub
    pub resource_id: String,
}

fn known_destination<'de, D>(deserializer: D) -> Result<Option<EventSubscriptionDestination>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventSubscriptionFilter {
    /// Event types delivered; `None` means all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_event_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_begins_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_ends_with: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub max_delivery_attempts: i32,
    pub event_time_to_live_in_minutes: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventDeliverySchema {
    EventGridSchema,
    CustomInputSchema,
    CloudEventSchemaV1_0,
}

/// Handle returned by a create-or-update call
///
/// Event Grid provisions subscriptions asynchronously: the resource ID is
/// only known once the operation completes, which callers observe through a
/// later `get`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOrUpdateHandle {
    /// URL to poll for the operation status
    pub async_operation: Option<String>,
    /// Resource as returned by the PUT, possibly still provisioning
    pub resource: Option<EventSubscription>,
}

/// Event Hub inside an Event Hubs namespace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventHub {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: EventHubProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventHubProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_retention_in_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
