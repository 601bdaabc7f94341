//! Third-party subscription reconciliation.
//!
//! Kinds whose upstream provider has its own subscription model plug in a
//! `SubscriptionReconciler`. The provider-independent part of the protocol
//! (get, compare, create or update, delete) lives in `sync_subscription` and
//! `delete_subscription`, which drive any `SubscriptionApi`.
//!
//! A subscription is identified by a name derived from the declared
//! resource, never by a server-side ID, so a reconcile can be repeated any
//! number of times and converges even after a partial failure.

use crate::error::ControllerError;
use crate::reconciler::ReconcileContext;
use async_trait::async_trait;

/// Provider operations on one named subscription within one scope.
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    type Subscription: Send + Sync;

    /// Current subscription, `None` when the provider reports it absent.
    async fn get(&self) -> Result<Option<Self::Subscription>, ControllerError>;

    /// Create or replace the subscription. Does not wait for the provider to
    /// finish provisioning it.
    async fn create_or_update(&self, desired: &Self::Subscription) -> Result<(), ControllerError>;

    async fn delete(&self) -> Result<DeleteOutcome, ControllerError>;

    /// Whether `current` matches `desired` on every field the controller owns.
    fn in_sync(&self, current: &Self::Subscription, desired: &Self::Subscription) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome<S> {
    /// Absent, created; the provider may not have assigned an ID yet
    Created,
    /// Drifted, replaced; carries the subscription as it was before
    Updated(S),
    /// Already up to date
    InSync(S),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Drives the provider toward `desired`.
pub async fn sync_subscription<A>(api: &A, desired: &A::Subscription) -> Result<SyncOutcome<A::Subscription>, ControllerError>
where
    A: SubscriptionApi + ?Sized,
{
    match api.get().await? {
        None => {
            api.create_or_update(desired).await?;
            Ok(SyncOutcome::Created)
        }
        Some(current) if api.in_sync(&current, desired) => Ok(SyncOutcome::InSync(current)),
        Some(current) => {
            api.create_or_update(desired).await?;
            Ok(SyncOutcome::Updated(current))
        }
    }
}

/// Deletes the subscription, treating "already absent" as success.
pub async fn delete_subscription<A>(api: &A) -> Result<DeleteOutcome, ControllerError>
where
    A: SubscriptionApi + ?Sized,
{
    match api.delete().await {
        Err(e) if e.is_not_found() => Ok(DeleteOutcome::NotFound),
        other => other,
    }
}

/// Capability of kinds that keep an external subscription in sync.
#[async_trait]
pub trait SubscriptionReconciler<K>: Send + Sync {
    /// Reconciles the subscription and records the outcome in `obj`'s status.
    async fn reconcile(&self, obj: &mut K, ctx: &ReconcileContext) -> Result<(), ControllerError>;

    /// Deletes the subscription of an object being deleted. Success, including
    /// an already absent subscription, allows the finalizer to be removed.
    async fn finalize(&self, obj: &K, ctx: &ReconcileContext) -> Result<(), ControllerError>;
}
