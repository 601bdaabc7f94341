//! User-supplied tweaks applied on top of the generated adapter workload.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extra environment variables and labels for the adapter workload
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdapterOverrides {
    /// Environment variables appended after the generated ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVarOverride>,

    /// Labels merged into the workload and pod template labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// A single name/value environment variable
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct EnvVarOverride {
    pub name: String,
    pub value: String,
}
