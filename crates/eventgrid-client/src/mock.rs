//! Mock ARM clients for unit testing
//!
//! In-memory implementations of the client traits that record how many times
//! each operation was called, so tests can assert on provider writes without
//! reaching Azure.

use crate::error::EventGridError;
use crate::eventgrid_trait::{EventHubsClientTrait, EventSubscriptionsClientTrait};
use crate::models::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(what: &str) -> EventGridError {
    EventGridError::NotFound(format!("{} not found", what))
}

fn injected(status: Option<u16>) -> Result<(), EventGridError> {
    match status {
        Some(status) => Err(EventGridError::Api {
            status,
            message: "injected failure".to_string(),
        }),
        None => Ok(()),
    }
}

/// Mock event subscriptions client
///
/// Subscriptions are keyed `<scope>/<name>`. `create_or_update` stores the
/// subscription with a generated ID but, like Event Grid, returns a handle
/// without it.
#[derive(Clone, Default)]
pub struct MockEventSubscriptionsClient {
    subscriptions: Arc<Mutex<HashMap<String, EventSubscription>>>,
    fail_with_status: Arc<Mutex<Option<u16>>>,
    get_calls: Arc<AtomicUsize>,
    create_or_update_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockEventSubscriptionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEventSubscriptionsClient")
            .field("subscriptions", &lock(&self.subscriptions).len())
            .finish_non_exhaustive()
    }
}

impl MockEventSubscriptionsClient {
    /// Create an empty mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription to the mock store (for test setup)
    pub fn add_subscription(&self, scope: &str, name: &str, subscription: EventSubscription) {
        lock(&self.subscriptions).insert(format!("{}/{}", scope, name), subscription);
    }

    /// Returns the stored subscription, if any
    pub fn subscription(&self, scope: &str, name: &str) -> Option<EventSubscription> {
        lock(&self.subscriptions).get(&format!("{}/{}", scope, name)).cloned()
    }

    /// Make every subsequent call fail with an API error carrying `status`
    pub fn fail_with_status(&self, status: Option<u16>) {
        *lock(&self.fail_with_status) = status;
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn create_or_update_calls(&self) -> usize {
        self.create_or_update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EventSubscriptionsClientTrait for MockEventSubscriptionsClient {
    async fn get(&self, scope: &str, name: &str) -> Result<EventSubscription, EventGridError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        injected(*lock(&self.fail_with_status))?;
        self.subscription(scope, name)
            .ok_or_else(|| not_found(&format!("event subscription {}", name)))
    }

    async fn create_or_update(
        &self,
        scope: &str,
        name: &str,
        subscription: &EventSubscription,
    ) -> Result<CreateOrUpdateHandle, EventGridError> {
        self.create_or_update_calls.fetch_add(1, Ordering::SeqCst);
        injected(*lock(&self.fail_with_status))?;

        let mut stored = subscription.clone();
        stored.id = Some(format!(
            "{}/providers/Microsoft.EventGrid/eventSubscriptions/{}",
            scope, name
        ));
        stored.name = Some(name.to_string());
        self.add_subscription(scope, name, stored);

        Ok(CreateOrUpdateHandle {
            async_operation: Some(format!("https://management.azure.com/operations/{}", name)),
            resource: None,
        })
    }

    async fn delete(&self, scope: &str, name: &str) -> Result<(), EventGridError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        injected(*lock(&self.fail_with_status))?;
        lock(&self.subscriptions)
            .remove(&format!("{}/{}", scope, name))
            .map(|_| ())
            .ok_or_else(|| not_found(&format!("event subscription {}", name)))
    }
}

/// Mock Event Hubs client, keyed by Event Hub resource ID
#[derive(Clone, Default)]
pub struct MockEventHubsClient {
    hubs: Arc<Mutex<HashMap<String, EventHub>>>,
    get_calls: Arc<AtomicUsize>,
    create_or_update_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockEventHubsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEventHubsClient")
            .field("hubs", &lock(&self.hubs).len())
            .finish_non_exhaustive()
    }
}

impl MockEventHubsClient {
    /// Create an empty mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an Event Hub to the mock store (for test setup)
    pub fn add_hub(&self, hub_id: &str, hub: EventHub) {
        lock(&self.hubs).insert(hub_id.to_string(), hub);
    }

    /// Whether an Event Hub with this ID is stored
    pub fn contains(&self, hub_id: &str) -> bool {
        lock(&self.hubs).contains_key(hub_id)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn create_or_update_calls(&self) -> usize {
        self.create_or_update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EventHubsClientTrait for MockEventHubsClient {
    async fn get(&self, hub_id: &str) -> Result<EventHub, EventGridError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.hubs)
            .get(hub_id)
            .cloned()
            .ok_or_else(|| not_found(hub_id))
    }

    async fn create_or_update(&self, hub_id: &str, hub: &EventHub) -> Result<EventHub, EventGridError> {
        self.create_or_update_calls.fetch_add(1, Ordering::SeqCst);
        let mut stored = hub.clone();
        stored.id = Some(hub_id.to_string());
        stored.name = hub_id.rsplit('/').next().map(str::to_string);
        self.add_hub(hub_id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, hub_id: &str) -> Result<(), EventGridError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.hubs)
            .remove(hub_id)
            .map(|_| ())
            .ok_or_else(|| not_found(hub_id))
    }
}
