//! Event destinations (sinks)
//!
//! A `Destination` is either a reference to an addressable Kubernetes object,
//! a URI, or both (in which case the URI is resolved relative to the object's
//! address).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where an adapter delivers the CloudEvents it produces
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Reference to an addressable object
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<KReference>,

    /// Absolute URI, or a path relative to the referenced object's address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Destination {
    /// Creates a destination from an absolute URI.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            reference: None,
            uri: Some(uri.into()),
        }
    }

    /// Creates a destination referencing an addressable object.
    pub fn from_ref(reference: KReference) -> Self {
        Self {
            reference: Some(reference),
            uri: None,
        }
    }
}

/// Reference to a Kubernetes object by apiVersion, kind and name
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KReference {
    /// API version of the referenced object (e.g. "eventing.knative.dev/v1")
    pub api_version: String,

    /// Kind of the referenced object (e.g. "Broker")
    pub kind: String,

    /// Name of the referenced object
    pub name: String,

    /// Namespace of the referenced object (defaults to the referencing object's namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl KReference {
    /// Splits `api_version` into its (group, version) parts. The core group is "".
    pub fn group_version(&self) -> (&str, &str) {
        match self.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.api_version.as_str()),
        }
    }
}
