//! Azure Resource Manager identifiers
//!
//! Declared resources carry ARM resource IDs as plain strings, e.g.
//! `/subscriptions/<sub>/resourceGroups/<rg>/providers/Microsoft.Storage/storageAccounts/<name>`,
//! which the controller parses into these types.
//! Parsing accepts subscription-level and resource-group-level IDs as well,
//! since Event Grid subscriptions may be scoped to either.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const PROVIDER_EVENT_HUB: &str = "Microsoft.EventHub";
const TYPE_EVENT_HUB_NAMESPACES: &str = "namespaces";

/// Error returned when a string is not a valid ARM resource ID
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("resource ID must start with /subscriptions/: {0}")]
    MissingSubscription(String),

    #[error("malformed resource ID {id}: {reason}")]
    Malformed { id: String, reason: &'static str },
}

/// Identifier of an Azure resource, resource group or subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AzureResourceId {
    pub subscription_id: String,
    pub resource_group: Option<String>,
    pub resource: Option<ProviderResource>,
}

/// The provider-qualified part of a resource ID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderResource {
    /// Resource provider namespace (e.g. "Microsoft.Storage")
    pub provider: String,
    /// Resource type (e.g. "storageAccounts")
    pub resource_type: String,
    /// Resource name
    pub name: String,
}

impl AzureResourceId {
    /// ID of a resource nested in a resource group.
    pub fn resource(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        provider: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: Some(resource_group.into()),
            resource: Some(ProviderResource {
                provider: provider.into(),
                resource_type: resource_type.into(),
                name: name.into(),
            }),
        }
    }

    /// Name of the resource, if this ID designates one.
    pub fn resource_name(&self) -> Option<&str> {
        self.resource.as_ref().map(|r| r.name.as_str())
    }
}

impl fmt::Display for AzureResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription_id)?;
        if let Some(rg) = &self.resource_group {
            write!(f, "/resourceGroups/{}", rg)?;
        }
        if let Some(r) = &self.resource {
            write!(f, "/providers/{}/{}/{}", r.provider, r.resource_type, r.name)?;
        }
        Ok(())
    }
}

impl FromStr for AzureResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| ResourceIdError::Malformed {
            id: s.to_string(),
            reason,
        };

        let parts: Vec<&str> = s.trim_end_matches('/').split('/').collect();
        // leading "/" yields an empty first element
        if parts.len() < 3 || !parts[0].is_empty() || !parts[1].eq_ignore_ascii_case("subscriptions") {
            return Err(ResourceIdError::MissingSubscription(s.to_string()));
        }
        if parts.iter().skip(1).any(|p| p.is_empty()) {
            return Err(malformed("empty path segment"));
        }

        let subscription_id = parts[2].to_string();
        match parts.len() {
            3 => Ok(Self {
                subscription_id,
                resource_group: None,
                resource: None,
            }),
            5 if parts[3].eq_ignore_ascii_case("resourceGroups") => Ok(Self {
                subscription_id,
                resource_group: Some(parts[4].to_string()),
                resource: None,
            }),
            9 if parts[3].eq_ignore_ascii_case("resourceGroups")
                && parts[5].eq_ignore_ascii_case("providers") =>
            {
                Ok(Self {
                    subscription_id,
                    resource_group: Some(parts[4].to_string()),
                    resource: Some(ProviderResource {
                        provider: parts[6].to_string(),
                        resource_type: parts[7].to_string(),
                        name: parts[8].to_string(),
                    }),
                })
            }
            _ => Err(malformed("unexpected number of path segments")),
        }
    }
}

/// Identifier of an Event Hub inside an Event Hubs namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventHubResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub namespace: String,
    pub event_hub: String,
}

impl EventHubResourceId {
    /// Builds the ID of `hub` inside the namespace designated by `namespace_id`.
    ///
    /// Fails when `namespace_id` is not a `Microsoft.EventHub/namespaces` resource.
    pub fn in_namespace(namespace_id: &AzureResourceId, hub: impl Into<String>) -> Result<Self, ResourceIdError> {
        let malformed = |reason| ResourceIdError::Malformed {
            id: namespace_id.to_string(),
            reason,
        };
        let resource_group = namespace_id
            .resource_group
            .clone()
            .ok_or_else(|| malformed("missing resource group"))?;
        let resource = namespace_id
            .resource
            .as_ref()
            .ok_or_else(|| malformed("missing Event Hubs namespace"))?;
        if !resource.provider.eq_ignore_ascii_case(PROVIDER_EVENT_HUB)
            || !resource.resource_type.eq_ignore_ascii_case(TYPE_EVENT_HUB_NAMESPACES)
        {
            return Err(malformed("not an Event Hubs namespace"));
        }

        Ok(Self {
            subscription_id: namespace_id.subscription_id.clone(),
            resource_group,
            namespace: resource.name.clone(),
            event_hub: hub.into(),
        })
    }

    /// ID of the Event Hubs namespace containing this hub.
    pub fn namespace_id(&self) -> AzureResourceId {
        AzureResourceId::resource(
            &self.subscription_id,
            &self.resource_group,
            PROVIDER_EVENT_HUB,
            TYPE_EVENT_HUB_NAMESPACES,
            &self.namespace,
        )
    }
}

impl fmt::Display for EventHubResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/eventhubs/{}", self.namespace_id(), self.event_hub)
    }
}
