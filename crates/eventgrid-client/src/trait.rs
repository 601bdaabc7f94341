//! Client traits for mocking
//!
//! The concrete ARM clients implement these traits, and tests use the
//! in-memory implementations from the `mock` module.

use crate::error::EventGridError;
use crate::models::*;

/// Event Grid event subscription operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait EventSubscriptionsClientTrait: Send + Sync {
    /// Fetch the subscription `name` under `scope`.
    async fn get(&self, scope: &str, name: &str) -> Result<EventSubscription, EventGridError>;

    /// Create or replace the subscription `name` under `scope`.
    ///
    /// Returns as soon as ARM has accepted the request; the returned handle
    /// does not necessarily carry the resource ID.
    async fn create_or_update(
        &self,
        scope: &str,
        name: &str,
        subscription: &EventSubscription,
    ) -> Result<CreateOrUpdateHandle, EventGridError>;

    /// Delete the subscription `name` under `scope`.
    async fn delete(&self, scope: &str, name: &str) -> Result<(), EventGridError>;
}

/// Event Hubs operations, addressed by full Event Hub resource ID
#[async_trait::async_trait]
pub trait EventHubsClientTrait: Send + Sync {
    async fn get(&self, hub_id: &str) -> Result<EventHub, EventGridError>;
    async fn create_or_update(&self, hub_id: &str, hub: &EventHub) -> Result<EventHub, EventGridError>;
    async fn delete(&self, hub_id: &str) -> Result<(), EventGridError>;
}
