//! Kubernetes Event recording.
//!
//! Reconcilers publish events through the `EventRecorder` trait so tests can
//! capture them. Events are fire-and-forget: a failed publish is logged and
//! never fails the reconcile.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Reporting component of every event emitted by the controller
pub const CONTROLLER_NAME: &str = "triggermesh-controller";

/// Event reasons, shown in the REASON column of `kubectl get events`.
pub mod reasons {
    pub const FINALIZER_UPDATE: &str = "FinalizerUpdate";
    pub const FINALIZER_MISSING: &str = "FinalizerMissing";
    pub const SUBSCRIBED: &str = "Subscribed";
    pub const UNSUBSCRIBED: &str = "Unsubscribed";
    pub const FAILED_SUBSCRIBE: &str = "FailedSubscribe";
    pub const FAILED_UNSUBSCRIBE: &str = "FailedUnsubscribe";
    pub const EVENT_HUB_CREATED: &str = "EventHubCreated";
    pub const EVENT_HUB_DELETED: &str = "EventHubDeleted";
    pub const ADAPTER_CREATED: &str = "AdapterCreated";
    pub const ADAPTER_UPDATED: &str = "AdapterUpdated";
    pub const FAILED_ADAPTER: &str = "FailedAdapter";
    pub const INTERNAL_ERROR: &str = "InternalError";
}

/// Severity of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Normal,
    Warning,
}

/// An event attached to a declared resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub kind: EventKind,
    pub reason: String,
    pub message: String,
}

impl RecordedEvent {
    pub fn normal(reason: &str, message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Normal,
            reason: reason.to_string(),
            message: message.into(),
        }
    }

    pub fn warning(reason: &str, message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Warning,
            reason: reason.to_string(),
            message: message.into(),
        }
    }
}

/// Trait for publishing Kubernetes Events.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    /// Publish `event` on the object referenced by `object`.
    async fn record(&self, object: &ObjectReference, event: RecordedEvent);
}

/// Production implementation wrapping `kube::runtime::events::Recorder`.
pub struct KubeEventRecorder {
    recorder: Recorder,
}

impl std::fmt::Debug for KubeEventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventRecorder").finish_non_exhaustive()
    }
}

impl KubeEventRecorder {
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventRecorder for KubeEventRecorder {
    async fn record(&self, object: &ObjectReference, event: RecordedEvent) {
        let type_ = match event.kind {
            EventKind::Normal => EventType::Normal,
            EventKind::Warning => EventType::Warning,
        };
        let published = Event {
            type_,
            reason: event.reason.clone(),
            note: Some(event.message),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&published, object).await {
            warn!(reason = %event.reason, error = %e, "Failed to publish Kubernetes event");
        }
    }
}
