//! Values that may be given inline or read from a Secret.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A string value provided either literally or from a Secret key
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValueFromField {
    /// Literal value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Reference to a key of a Secret in the resource's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from_secret: Option<SecretKeySelector>,
}

/// Selects a key of a Secret
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SecretKeySelector {
    /// Name of the Secret
    pub name: String,

    /// Key within the Secret's data
    pub key: String,
}

impl ValueFromField {
    /// Literal value.
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            value_from_secret: None,
        }
    }

    /// Value read from `secret`/`key`.
    pub fn from_secret(secret: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            value: None,
            value_from_secret: Some(SecretKeySelector {
                name: secret.into(),
                key: key.into(),
            }),
        }
    }
}
