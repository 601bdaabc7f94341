//! ARM clients
//!
//! Event subscriptions live under the resource they watch:
//! `{scope}/providers/Microsoft.EventGrid/eventSubscriptions/{name}`.
//! Event Hubs are addressed by their full resource ID.

use crate::auth::{AzureEndpoints, ServicePrincipalCredentials};
use crate::common::HttpClient;
use crate::error::EventGridError;
use crate::eventgrid_trait::{EventHubsClientTrait, EventSubscriptionsClientTrait};
use crate::models::*;
use tracing::debug;

fn check_path(what: &str, value: &str) -> Result<(), EventGridError> {
    if !value.starts_with('/') {
        return Err(EventGridError::InvalidRequest(format!(
            "{} must be an absolute resource ID: {}",
            what, value
        )));
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), EventGridError> {
    if name.is_empty() || name.contains('/') {
        return Err(EventGridError::InvalidRequest(format!(
            "invalid event subscription name: {:?}",
            name
        )));
    }
    Ok(())
}

/// Event Grid event subscriptions client
#[derive(Debug, Clone)]
pub struct EventSubscriptionsClient {
    http: HttpClient,
}

impl EventSubscriptionsClient {
    /// Create a new client authenticating as the given service principal
    pub fn new(endpoints: AzureEndpoints, credentials: ServicePrincipalCredentials) -> Result<Self, EventGridError> {
        Ok(Self::with_http(HttpClient::connect(&endpoints, credentials)?))
    }

    /// Create a client on an existing HTTP wrapper. Clients built from
    /// clones of one wrapper share its access token.
    pub fn with_http(http: HttpClient) -> Self {
        Self { http }
    }

    fn path(scope: &str, name: &str) -> Result<String, EventGridError> {
        check_path("scope", scope)?;
        check_name(name)?;
        Ok(format!(
            "{}/providers/Microsoft.EventGrid/eventSubscriptions/{}",
            scope.trim_end_matches('/'),
            urlencoding::encode(name)
        ))
    }
}

#[async_trait::async_trait]
impl EventSubscriptionsClientTrait for EventSubscriptionsClient {
    async fn get(&self, scope: &str, name: &str) -> Result<EventSubscription, EventGridError> {
        let path = Self::path(scope, name)?;
        self.http.get(&path, EVENT_GRID_API_VERSION).await
    }

    async fn create_or_update(
        &self,
        scope: &str,
        name: &str,
        subscription: &EventSubscription,
    ) -> Result<CreateOrUpdateHandle, EventGridError> {
        let path = Self::path(scope, name)?;
        let response = self.http.put(&path, EVENT_GRID_API_VERSION, subscription).await?;
        debug!(
            "Event subscription {} accepted (async operation: {:?})",
            name, response.async_operation
        );
        Ok(CreateOrUpdateHandle {
            async_operation: response.async_operation,
            resource: response.body,
        })
    }

    async fn delete(&self, scope: &str, name: &str) -> Result<(), EventGridError> {
        let path = Self::path(scope, name)?;
        self.http.delete(&path, EVENT_GRID_API_VERSION).await
    }
}

/// Event Hubs client
#[derive(Debug, Clone)]
pub struct EventHubsClient {
    http: HttpClient,
}

impl EventHubsClient {
    /// Create a new client authenticating as the given service principal
    pub fn new(endpoints: AzureEndpoints, credentials: ServicePrincipalCredentials) -> Result<Self, EventGridError> {
        Ok(Self::with_http(HttpClient::connect(&endpoints, credentials)?))
    }

    /// Create a client sharing an existing HTTP wrapper
    pub fn with_http(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl EventHubsClientTrait for EventHubsClient {
    async fn get(&self, hub_id: &str) -> Result<EventHub, EventGridError> {
        check_path("Event Hub ID", hub_id)?;
        self.http.get(hub_id, EVENT_HUB_API_VERSION).await
    }

    async fn create_or_update(&self, hub_id: &str, hub: &EventHub) -> Result<EventHub, EventGridError> {
        check_path("Event Hub ID", hub_id)?;
        let response = self.http.put(hub_id, EVENT_HUB_API_VERSION, hub).await?;
        // Event Hubs are created synchronously
        response.body.ok_or_else(|| EventGridError::Api {
            status: 200,
            message: format!("empty response creating Event Hub {}", hub_id),
        })
    }

    async fn delete(&self, hub_id: &str) -> Result<(), EventGridError> {
        check_path("Event Hub ID", hub_id)?;
        self.http.delete(hub_id, EVENT_HUB_API_VERSION).await
    }
}
