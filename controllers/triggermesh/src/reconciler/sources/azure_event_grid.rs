//! AzureEventGridSource reconciliation.
//!
//! The receive adapter reads events from an Event Hub that an Event Grid
//! event subscription on `spec.scope` delivers into. The controller owns:
//!
//! - the adapter Deployment
//! - the event subscription `io.triggermesh.azureeventgridsources.<ns>.<name>`
//! - when no hub is named in the spec, the Event Hub
//!   `io.triggermesh.azureeventgridsources-<ns>.<name>`

use crate::cluster::ClusterClient;
use crate::config::ObservabilityConfig;
use crate::error::{ControllerError, ErrorClass};
use crate::events::{reasons, RecordedEvent};
use crate::reconciler::adapter::{env_value, new_adapter_spec, value_from_env, AdapterBuilder, WorkloadKind, WorkloadSpec};
use crate::reconciler::status::StatusManager;
use crate::reconciler::subscription::{
    delete_subscription, sync_subscription, DeleteOutcome, SubscriptionApi, SubscriptionReconciler, SyncOutcome,
};
use crate::reconciler::ReconcileContext;
use async_trait::async_trait;
use crds::{AzureEventGridSource, EventHubResourceId, Reconcilable, ValueFromField};
use eventgrid_client::{
    AzureEndpoints, EventDeliverySchema, EventHub, EventHubDestination, EventHubsClient, EventHubsClientTrait,
    EventSubscription, EventSubscriptionDestination, EventSubscriptionFilter, EventSubscriptionProperties,
    EventSubscriptionsClient, EventSubscriptionsClientTrait, HttpClient, RetryPolicy, ServicePrincipalCredentials,
};
use kube::{Resource, ResourceExt};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

pub const ENV_AZURE_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_AZURE_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_AZURE_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const ENV_AZURE_HUB_NAMESPACE: &str = "AZURE_HUB_NAMESPACE";
pub const ENV_AZURE_HUB_NAME: &str = "AZURE_HUB_NAME";

const METRICS_DOMAIN: &str = "triggermesh.io/sources";

const MAX_DELIVERY_ATTEMPTS: i32 = 30;
const EVENT_TTL_MINUTES: i32 = 1440;

/// Name of the event subscription owned by `src`.
pub fn subscription_name(src: &AzureEventGridSource) -> String {
    format!(
        "io.triggermesh.{}.{}.{}",
        AzureEventGridSource::plural(&()),
        src.namespace().unwrap_or_default(),
        src.name_any()
    )
}

/// Name of the Event Hub managed for `src` when the spec names none.
pub fn managed_event_hub_name(src: &AzureEventGridSource) -> String {
    format!(
        "io.triggermesh.{}-{}.{}",
        AzureEventGridSource::plural(&()),
        src.namespace().unwrap_or_default(),
        src.name_any()
    )
}

/// Event Hub the subscription delivers into, either declared or managed.
pub fn event_hub_id(src: &AzureEventGridSource) -> Result<EventHubResourceId, ControllerError> {
    let hub = src
        .spec
        .endpoint
        .event_hubs
        .hub_name
        .clone()
        .unwrap_or_else(|| managed_event_hub_name(src));
    src.event_hubs_namespace_id()
        .and_then(|namespace| EventHubResourceId::in_namespace(&namespace, hub))
        .map_err(|e| ControllerError::InvalidConfig(format!("Invalid Event Hubs endpoint: {}", e)))
}

/// Canonical form of `spec.scope`.
pub fn subscription_scope(src: &AzureEventGridSource) -> Result<String, ControllerError> {
    src.scope_id()
        .map(|id| id.to_string())
        .map_err(|e| ControllerError::InvalidConfig(format!("Invalid scope: {}", e)))
}

/// Subscription the controller wants on `spec.scope`.
pub fn desired_subscription(src: &AzureEventGridSource, hub: &EventHubResourceId) -> EventSubscription {
    let event_types = src.event_types();
    EventSubscription {
        id: None,
        name: None,
        properties: EventSubscriptionProperties {
            destination: Some(EventSubscriptionDestination::EventHub(EventHubDestination {
                resource_id: hub.to_string(),
            })),
            filter: Some(EventSubscriptionFilter {
                included_event_types: (!event_types.is_empty()).then(|| event_types.to_vec()),
                ..Default::default()
            }),
            retry_policy: Some(RetryPolicy {
                max_delivery_attempts: MAX_DELIVERY_ATTEMPTS,
                event_time_to_live_in_minutes: EVENT_TTL_MINUTES,
            }),
            event_delivery_schema: Some(EventDeliverySchema::CloudEventSchemaV1_0),
            provisioning_state: None,
        },
    }
}

fn same_destination(current: Option<&EventSubscriptionDestination>, desired: Option<&EventSubscriptionDestination>) -> bool {
    match (current, desired) {
        // ARM lowercases parts of resource IDs it returns
        (Some(EventSubscriptionDestination::EventHub(c)), Some(EventSubscriptionDestination::EventHub(d))) => {
            c.resource_id.eq_ignore_ascii_case(&d.resource_id)
        }
        (c, d) => c == d,
    }
}

fn sorted_event_types(filter: Option<&EventSubscriptionFilter>) -> Vec<String> {
    let mut types = filter
        .and_then(|f| f.included_event_types.clone())
        .unwrap_or_default();
    types.sort();
    types.dedup();
    types
}

/// Compares the fields the controller owns: destination, event type filter,
/// retry policy and delivery schema. IDs and provisioning state are ignored.
pub fn subscriptions_in_sync(current: &EventSubscription, desired: &EventSubscription) -> bool {
    let (c, d) = (&current.properties, &desired.properties);
    same_destination(c.destination.as_ref(), d.destination.as_ref())
        && sorted_event_types(c.filter.as_ref()) == sorted_event_types(d.filter.as_ref())
        && c.retry_policy == d.retry_policy
        && c.event_delivery_schema == d.event_delivery_schema
}

/// Builds the receive adapter Deployment.
#[derive(Debug, Clone)]
pub struct AzureEventGridAdapterBuilder {
    image: String,
    observability: ObservabilityConfig,
}

impl AzureEventGridAdapterBuilder {
    pub fn new(image: impl Into<String>, observability: ObservabilityConfig) -> Self {
        Self {
            image: image.into(),
            observability,
        }
    }
}

impl AdapterBuilder<AzureEventGridSource> for AzureEventGridAdapterBuilder {
    fn build_adapter(&self, src: &AzureEventGridSource, sink_uri: &str) -> Result<WorkloadSpec, ControllerError> {
        let sp = src.spec.auth.service_principal.as_ref().ok_or_else(|| {
            ControllerError::InvalidConfig("Service principal credentials are required".to_string())
        })?;
        let hub = event_hub_id(src)?;

        let env = vec![
            value_from_env(ENV_AZURE_TENANT_ID, &sp.tenant_id)?,
            value_from_env(ENV_AZURE_CLIENT_ID, &sp.client_id)?,
            value_from_env(ENV_AZURE_CLIENT_SECRET, &sp.client_secret)?,
            env_value(ENV_AZURE_HUB_NAMESPACE, hub.namespace),
            env_value(ENV_AZURE_HUB_NAME, hub.event_hub),
        ];

        new_adapter_spec(
            src,
            WorkloadKind::Deployment,
            &self.image,
            sink_uri,
            env,
            &self.observability,
            METRICS_DOMAIN,
        )
    }
}

/// ARM clients authenticated as the source's service principal
#[derive(Clone)]
pub struct AzureClients {
    pub subscriptions: Arc<dyn EventSubscriptionsClientTrait>,
    pub event_hubs: Arc<dyn EventHubsClientTrait>,
}

impl std::fmt::Debug for AzureClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureClients").finish_non_exhaustive()
    }
}

/// Obtains ARM clients for a source.
#[async_trait]
pub trait ClientGetter: Send + Sync {
    async fn get(&self, src: &AzureEventGridSource) -> Result<AzureClients, ControllerError>;
}

/// Cache key of a service principal. The secret is only kept as a digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PrincipalKey {
    tenant_id: String,
    client_id: String,
}

fn secret_digest(secret: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    secret.hash(&mut hasher);
    hasher.finish()
}

/// `ClientGetter` reading the service principal from the spec and its
/// secrets. Clients are kept per service principal so that their token
/// cache survives across reconciles; a rotated secret replaces them.
#[derive(Clone)]
pub struct CredentialsClientGetter {
    cluster: Arc<dyn ClusterClient>,
    endpoints: AzureEndpoints,
    clients: Arc<Mutex<HashMap<PrincipalKey, (u64, AzureClients)>>>,
}

impl std::fmt::Debug for CredentialsClientGetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsClientGetter")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl CredentialsClientGetter {
    pub fn new(cluster: Arc<dyn ClusterClient>, endpoints: AzureEndpoints) -> Self {
        Self {
            cluster,
            endpoints,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn connect(&self, credentials: ServicePrincipalCredentials) -> Result<AzureClients, ControllerError> {
        let http = HttpClient::connect(&self.endpoints, credentials)?;
        Ok(AzureClients {
            subscriptions: Arc::new(EventSubscriptionsClient::with_http(http.clone())),
            event_hubs: Arc::new(EventHubsClient::with_http(http)),
        })
    }

    async fn resolve(&self, namespace: &str, field: &ValueFromField, what: &str) -> Result<String, ControllerError> {
        match (&field.value, &field.value_from_secret) {
            (Some(value), _) => Ok(value.clone()),
            (None, Some(secret)) => self.cluster.get_secret_value(namespace, &secret.name, &secret.key).await,
            (None, None) => Err(ControllerError::InvalidConfig(format!(
                "The {} of the service principal has neither a value nor a secret reference",
                what
            ))),
        }
    }
}

#[async_trait]
impl ClientGetter for CredentialsClientGetter {
    async fn get(&self, src: &AzureEventGridSource) -> Result<AzureClients, ControllerError> {
        let sp = src.spec.auth.service_principal.as_ref().ok_or_else(|| {
            ControllerError::InvalidConfig("Service principal credentials are required".to_string())
        })?;
        let namespace = src.namespace().unwrap_or_default();

        let credentials = ServicePrincipalCredentials {
            tenant_id: self.resolve(&namespace, &sp.tenant_id, "tenant ID").await?,
            client_id: self.resolve(&namespace, &sp.client_id, "client ID").await?,
            client_secret: self.resolve(&namespace, &sp.client_secret, "client secret").await?,
        };

        let key = PrincipalKey {
            tenant_id: credentials.tenant_id.clone(),
            client_id: credentials.client_id.clone(),
        };
        let digest = secret_digest(&credentials.client_secret);

        let mut cache = self
            .clients
            .lock()
            .map_err(|e| ControllerError::Internal(format!("Azure client cache poisoned: {}", e)))?;
        if let Some((cached_digest, clients)) = cache.get(&key) {
            if *cached_digest == digest {
                return Ok(clients.clone());
            }
            debug!("Secret of client {} changed, replacing its ARM clients", key.client_id);
        }
        let clients = self.connect(credentials)?;
        cache.insert(key, (digest, clients.clone()));
        Ok(clients)
    }
}

/// One named event subscription on one scope, with every call racing
/// against shutdown.
struct EventGridSubscriptionApi<'a> {
    client: &'a dyn EventSubscriptionsClientTrait,
    scope: String,
    name: String,
    ctx: &'a ReconcileContext,
}

#[async_trait]
impl SubscriptionApi for EventGridSubscriptionApi<'_> {
    type Subscription = EventSubscription;

    async fn get(&self) -> Result<Option<EventSubscription>, ControllerError> {
        let result = self
            .ctx
            .shutdown
            .run(async { Ok::<_, ControllerError>(self.client.get(&self.scope, &self.name).await?) })
            .await;
        match result {
            Ok(sub) => Ok(Some(sub)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_or_update(&self, desired: &EventSubscription) -> Result<(), ControllerError> {
        let handle = self
            .ctx
            .shutdown
            .run(async { Ok::<_, ControllerError>(self.client.create_or_update(&self.scope, &self.name, desired).await?) })
            .await?;
        debug!(
            "Event subscription {} accepted, operation {:?}",
            self.name, handle.async_operation
        );
        Ok(())
    }

    async fn delete(&self) -> Result<DeleteOutcome, ControllerError> {
        self.ctx
            .shutdown
            .run(async { Ok::<_, ControllerError>(self.client.delete(&self.scope, &self.name).await?) })
            .await?;
        Ok(DeleteOutcome::Deleted)
    }

    fn in_sync(&self, current: &EventSubscription, desired: &EventSubscription) -> bool {
        subscriptions_in_sync(current, desired)
    }
}

/// Keeps the Event Grid subscription, and the managed Event Hub if any, in
/// line with the source's spec.
pub struct AzureEventGridSubscriptionReconciler {
    clients: Arc<dyn ClientGetter>,
}

impl std::fmt::Debug for AzureEventGridSubscriptionReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureEventGridSubscriptionReconciler").finish_non_exhaustive()
    }
}

impl AzureEventGridSubscriptionReconciler {
    pub fn new(clients: Arc<dyn ClientGetter>) -> Self {
        Self { clients }
    }

    /// Creates the managed Event Hub when it does not exist. Declared hubs
    /// are never touched.
    async fn ensure_event_hub(
        &self,
        src: &AzureEventGridSource,
        clients: &AzureClients,
        ctx: &ReconcileContext,
    ) -> Result<EventHubResourceId, ControllerError> {
        let hub = event_hub_id(src)?;
        if src.spec.endpoint.event_hubs.hub_name.is_some() {
            return Ok(hub);
        }

        let hub_id = hub.to_string();
        let created = ctx
            .shutdown
            .run(async {
                match clients.event_hubs.get(&hub_id).await {
                    Ok(_) => Ok::<bool, ControllerError>(false),
                    Err(e) if e.is_not_found() => {
                        clients.event_hubs.create_or_update(&hub_id, &EventHub::default()).await?;
                        Ok(true)
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        if created {
            info!("Created Event Hub {}", hub_id);
            ctx.recorder
                .record(
                    &src.object_ref(&()),
                    RecordedEvent::normal(reasons::EVENT_HUB_CREATED, format!("Created Event Hub {:?}", hub_id)),
                )
                .await;
        }
        Ok(hub)
    }

    async fn delete_event_hub(
        &self,
        src: &AzureEventGridSource,
        clients: &AzureClients,
        ctx: &ReconcileContext,
    ) -> Result<(), ControllerError> {
        if src.spec.endpoint.event_hubs.hub_name.is_some() {
            return Ok(());
        }
        let Ok(hub) = event_hub_id(src) else {
            warn!("Event Hubs namespace {:?} is invalid, nothing to delete", src.spec.endpoint.event_hubs.namespace_id);
            return Ok(());
        };
        let hub_id = hub.to_string();

        let result = ctx
            .shutdown
            .run(async { Ok::<_, ControllerError>(clients.event_hubs.delete(&hub_id).await?) })
            .await;
        let event = match result {
            Ok(()) => RecordedEvent::normal(reasons::EVENT_HUB_DELETED, format!("Deleted Event Hub {:?}", hub_id)),
            Err(e) if e.is_not_found() => RecordedEvent::warning(
                reasons::EVENT_HUB_DELETED,
                "Event Hub not found, skipping deletion",
            ),
            Err(e) => return Err(e),
        };
        ctx.recorder.record(&src.object_ref(&()), event).await;
        Ok(())
    }

    async fn sync(&self, src: &mut AzureEventGridSource, ctx: &ReconcileContext) -> Result<(), ControllerError> {
        let scope = subscription_scope(src)?;
        let clients = self.clients.get(src).await?;

        let hub = self.ensure_event_hub(src, &clients, ctx).await?;
        src.status_mut().event_hub_id = Some(hub.to_string());

        let api = EventGridSubscriptionApi {
            client: clients.subscriptions.as_ref(),
            scope: scope.clone(),
            name: subscription_name(src),
            ctx,
        };
        let desired = desired_subscription(src, &hub);
        let outcome = sync_subscription(&api, &desired).await?;

        let (subscription_id, message) = match outcome {
            SyncOutcome::Created => (
                None,
                Some(format!("Created event subscription {:?} for Azure resource {:?}", api.name, scope)),
            ),
            SyncOutcome::Updated(current) => (
                current.id,
                Some(format!("Updated event subscription {:?} for Azure resource {:?}", api.name, scope)),
            ),
            SyncOutcome::InSync(current) => (current.id, None),
        };

        StatusManager::new(src.source_status_mut(), AzureEventGridSource::CONDITIONS).mark_subscribed();
        src.status_mut().event_subscription_id = subscription_id;

        if let Some(message) = message {
            info!("{}", message);
            ctx.recorder
                .record(&src.object_ref(&()), RecordedEvent::normal(reasons::SUBSCRIBED, message))
                .await;
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionReconciler<AzureEventGridSource> for AzureEventGridSubscriptionReconciler {
    #[instrument(skip_all, fields(source = %format!("{}/{}", src.namespace().unwrap_or_default(), src.name_any())))]
    async fn reconcile(&self, src: &mut AzureEventGridSource, ctx: &ReconcileContext) -> Result<(), ControllerError> {
        let result = self.sync(src, ctx).await;

        if let Err(e) = &result {
            match e.class() {
                // Retried as is; the condition keeps its last known value
                ErrorClass::Transient => debug!("Transient failure reconciling event subscription: {}", e),
                _ => {
                    warn!("Failed to reconcile event subscription: {}", e);
                    let message = format!("Failed to reconcile event subscription: {}", e);
                    let changed = StatusManager::new(src.source_status_mut(), AzureEventGridSource::CONDITIONS)
                        .mark_not_subscribed(reasons::FAILED_SUBSCRIBE, &message);
                    if changed {
                        ctx.recorder
                            .record(&src.object_ref(&()), RecordedEvent::warning(reasons::FAILED_SUBSCRIBE, message))
                            .await;
                    }
                }
            }
        }
        result
    }

    #[instrument(skip_all, fields(source = %format!("{}/{}", src.namespace().unwrap_or_default(), src.name_any())))]
    async fn finalize(&self, src: &AzureEventGridSource, ctx: &ReconcileContext) -> Result<(), ControllerError> {
        let clients = self.clients.get(src).await?;
        let Ok(scope) = subscription_scope(src) else {
            // No subscription can have been created on an invalid scope
            warn!("Scope {:?} is invalid, nothing to unsubscribe", src.spec.scope);
            ctx.recorder
                .record(
                    &src.object_ref(&()),
                    RecordedEvent::warning(reasons::UNSUBSCRIBED, "Invalid scope, skipping event subscription deletion"),
                )
                .await;
            return self.delete_event_hub(src, &clients, ctx).await;
        };
        let api = EventGridSubscriptionApi {
            client: clients.subscriptions.as_ref(),
            scope: scope.clone(),
            name: subscription_name(src),
            ctx,
        };

        let event = match delete_subscription(&api).await? {
            DeleteOutcome::Deleted => {
                info!("Deleted event subscription {} on {}", api.name, scope);
                RecordedEvent::normal(
                    reasons::UNSUBSCRIBED,
                    format!("Deleted event subscription {:?} for Azure resource {:?}", api.name, scope),
                )
            }
            DeleteOutcome::NotFound => {
                warn!("Event subscription {} not found on {}", api.name, scope);
                RecordedEvent::warning(reasons::UNSUBSCRIBED, "Event subscription not found, skipping deletion")
            }
        };
        ctx.recorder.record(&src.object_ref(&()), event).await;

        self.delete_event_hub(src, &clients, ctx).await
    }
}
