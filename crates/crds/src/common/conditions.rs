//! Status conditions
//!
//! Conditions follow the Kubernetes API conventions: a `type`, a tri-state
//! `status`, an optional machine-readable `reason`, a human-readable `message`
//! and the time of the last status transition.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type aggregating every other condition of a resource.
pub const CONDITION_READY: &str = "Ready";

/// Condition type reporting whether the sink was resolved to a URI.
pub const CONDITION_SINK_PROVIDED: &str = "SinkProvided";

/// Condition type mirroring the availability of the adapter workload.
pub const CONDITION_DEPLOYMENT_AVAILABLE: &str = "DeploymentAvailable";

/// Condition type reporting whether the external subscription exists.
pub const CONDITION_SUBSCRIBED: &str = "Subscribed";

/// Tri-state value of a condition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl ConditionStatus {
    /// Returns the wire representation ("True", "False", "Unknown").
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

/// A single observation of one aspect of a resource's state
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of the condition (e.g. "Ready", "SinkProvided")
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition
    pub status: ConditionStatus,

    /// One-word CamelCase reason for the condition's last transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the last transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    /// Creates a condition in the `Unknown` state with no reason.
    pub fn unknown(type_: &str) -> Self {
        Self {
            type_: type_.to_string(),
            status: ConditionStatus::Unknown,
            reason: None,
            message: None,
            last_transition_time: None,
        }
    }
}
