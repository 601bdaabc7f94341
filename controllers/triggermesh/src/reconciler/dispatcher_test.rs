//! Unit tests for the reconcile dispatcher

#[cfg(test)]
mod tests {
    use crate::cluster::{ClusterClient, ObjectClient};
    use crate::config::{ControllerConfig, ObservabilityConfig};
    use crate::error::ControllerError;
    use crate::events::EventRecorder;
    use crate::reconciler::adapter::{AdapterBuilder, WorkloadKind};
    use crate::reconciler::flow::DataWeaveAdapterBuilder;
    use crate::reconciler::sources::azure_event_grid::{desired_subscription, event_hub_id, subscription_name};
    use crate::reconciler::sources::{AzureEventGridAdapterBuilder, AzureEventGridSubscriptionReconciler};
    use crate::reconciler::status::StatusManager;
    use crate::reconciler::workload::WorkloadReconciler;
    use crate::reconciler::Reconciler;
    use crate::shutdown;
    use crate::test_utils::*;
    use crate::cluster::WorkloadAvailability;
    use crds::{
        AzureEventGridSource, ConditionStatus, DataWeaveTransformation, Destination, KReference, Reconcilable,
        CONDITION_SINK_PROVIDED,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use kube_runtime::controller::Action;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    const ADAPTER_IMAGE: &str = "adapter:v1";
    const SUBSCRIPTION_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/MyGroup/providers/Microsoft.Storage/storageAccounts/mystorageaccount/providers/Microsoft.EventGrid/eventSubscriptions/io.triggermesh.azureeventgridsources.testns.test";

    struct Harness {
        cluster: Arc<FakeCluster>,
        objects: Arc<FakeObjectClient>,
        recorder: Arc<FakeRecorder>,
    }

    fn harness() -> Harness {
        Harness {
            cluster: Arc::new(FakeCluster::new()),
            objects: Arc::new(FakeObjectClient::default()),
            recorder: Arc::new(FakeRecorder::default()),
        }
    }

    fn reconciler<K: Reconcilable>(
        h: &Harness,
        objects: Vec<K>,
        builder: Arc<dyn AdapterBuilder<K>>,
    ) -> Reconciler<K> {
        let (_, signal) = shutdown::channel();
        Reconciler::new(
            lister_with(objects),
            builder,
            h.cluster.clone() as Arc<dyn ClusterClient>,
            h.objects.clone() as Arc<dyn ObjectClient>,
            h.recorder.clone() as Arc<dyn EventRecorder>,
            signal,
            &ControllerConfig::default(),
        )
    }

    fn source_builder() -> AzureEventGridAdapterBuilder {
        AzureEventGridAdapterBuilder::new(ADAPTER_IMAGE, ObservabilityConfig::default())
    }

    fn source_reconciler(
        h: &Harness,
        getter: &MockClientGetter,
        objects: Vec<AzureEventGridSource>,
    ) -> Reconciler<AzureEventGridSource> {
        reconciler(h, objects, Arc::new(source_builder()))
            .with_subscriptions(Arc::new(AzureEventGridSubscriptionReconciler::new(Arc::new(getter.clone()))))
    }

    fn deleted(mut src: AzureEventGridSource) -> AzureEventGridSource {
        let now: Time = serde_json::from_value(json!("2024-01-01T00:00:00Z")).unwrap();
        src.metadata.deletion_timestamp = Some(now);
        src
    }

    /// `conditions[type]` of a status patch.
    fn condition(patch: &Value, type_: &str) -> Value {
        patch["status"]["conditions"]
            .as_array()
            .and_then(|conds| conds.iter().find(|c| c["type"] == type_))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// `src` as the informer would deliver it after `patch` was applied.
    fn with_written_status(mut src: AzureEventGridSource, patch: &Value) -> AzureEventGridSource {
        src.status = Some(serde_json::from_value(patch["status"].clone()).unwrap());
        src
    }

    /// Source whose adapter, RBAC, subscription and status are all up to date.
    async fn seed_in_sync_source(h: &Harness, getter: &MockClientGetter) -> AzureEventGridSource {
        let mut src = new_azure_event_grid_source("testns", "test");
        let hub = event_hub_id(&src).unwrap();

        let spec = source_builder().build_adapter(&src, TEST_SINK_URI).unwrap();
        let observed = observed_from_spec(&spec, Some(available()));
        h.cluster.seed_workload(&spec, observed.clone());
        WorkloadReconciler::new(h.cluster.clone() as Arc<dyn ClusterClient>)
            .ensure_rbac(&src, WorkloadKind::Deployment)
            .await
            .unwrap();

        let mut current = desired_subscription(&src, &hub);
        current.id = Some(SUBSCRIPTION_ID.to_string());
        getter.subscriptions.add_subscription(TEST_SCOPE, &subscription_name(&src), current);

        {
            let mut status = StatusManager::new(src.source_status_mut(), AzureEventGridSource::CONDITIONS);
            status.mark_sink(TEST_SINK_URI);
            status.propagate_deployment_availability(Some(&observed));
            status.mark_subscribed();
            status.set_observed_generation(Some(1));
        }
        src.status_mut().event_subscription_id = Some(SUBSCRIPTION_ID.to_string());
        src.status_mut().event_hub_id = Some(hub.to_string());
        src
    }

    #[tokio::test]
    async fn test_deleted_object_is_ignored() {
        let h = harness();
        let getter = MockClientGetter::new();
        let reconciler = source_reconciler(&h, &getter, vec![]);

        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::await_change());
        assert!(h.objects.metadata_patches().is_empty());
        assert!(h.objects.status_patches().is_empty());
        assert!(h.recorder.events().is_empty());
        assert_eq!(getter.subscriptions.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_in_sync_source_writes_nothing() {
        let h = harness();
        let getter = MockClientGetter::new();
        let src = seed_in_sync_source(&h, &getter).await;
        let reconciler = source_reconciler(&h, &getter, vec![src]);

        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::await_change());
        assert!(h.objects.status_patches().is_empty());
        assert!(h.objects.metadata_patches().is_empty());
        assert!(h.recorder.events().is_empty());
        assert_eq!(h.cluster.workload_creates() + h.cluster.workload_updates(), 0);
        assert_eq!(h.cluster.service_account_creates(), 1);
        assert_eq!(h.cluster.service_account_updates(), 0);
        assert_eq!(getter.subscriptions.get_calls(), 1);
        assert_eq!(getter.subscriptions.create_or_update_calls(), 0);
    }

    #[tokio::test]
    async fn test_drifted_retry_policy_is_updated() {
        let h = harness();
        let getter = MockClientGetter::new();
        let src = seed_in_sync_source(&h, &getter).await;
        let name = subscription_name(&src);
        let mut drifted = getter.subscriptions.subscription(TEST_SCOPE, &name).unwrap();
        if let Some(policy) = drifted.properties.retry_policy.as_mut() {
            policy.event_time_to_live_in_minutes += 1;
        }
        getter.subscriptions.add_subscription(TEST_SCOPE, &name, drifted);
        let reconciler = source_reconciler(&h, &getter, vec![src]);

        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::await_change());
        assert_eq!(getter.subscriptions.get_calls(), 1);
        assert_eq!(getter.subscriptions.create_or_update_calls(), 1);
        assert_eq!(
            getter
                .subscriptions
                .subscription(TEST_SCOPE, &name)
                .and_then(|s| s.properties.retry_policy)
                .map(|p| p.event_time_to_live_in_minutes),
            Some(1440)
        );
        assert_eq!(
            h.recorder.events(),
            [format!(
                "Normal Subscribed Updated event subscription \"io.triggermesh.azureeventgridsources.testns.test\" for Azure resource {:?}",
                TEST_SCOPE
            )]
        );
        assert_eq!(h.cluster.workload_updates(), 0);
        assert!(h.objects.status_patches().is_empty());
    }

    #[tokio::test]
    async fn test_drifted_adapter_env_is_updated() {
        let h = harness();
        let getter = MockClientGetter::new();
        let src = seed_in_sync_source(&h, &getter).await;

        let spec = source_builder().build_adapter(&src, TEST_SINK_URI).unwrap();
        let unavailable = WorkloadAvailability {
            status: ConditionStatus::False,
            reason: Some("MinimumReplicasUnavailable".to_string()),
            message: Some("Deployment does not have minimum availability.".to_string()),
        };
        let mut drifted = observed_from_spec(&spec, Some(unavailable.clone()));
        if let Some(var) = drifted.env.first_mut() {
            var.value = Some("drifted".to_string());
        }
        h.cluster.seed_workload(&spec, drifted);
        h.cluster.set_availability(Some(unavailable));
        let reconciler = source_reconciler(&h, &getter, vec![src]);

        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::await_change());
        assert_eq!(h.cluster.workload_creates(), 0);
        assert_eq!(h.cluster.workload_updates(), 1);
        let workload = h
            .cluster
            .workload(WorkloadKind::Deployment, "testns", "azureeventgridsource-test")
            .unwrap();
        assert_eq!(workload.env, spec.env);
        assert_eq!(
            h.recorder.events(),
            ["Normal AdapterUpdated Updated adapter Deployment \"azureeventgridsource-test\""]
        );
        assert_eq!(getter.subscriptions.create_or_update_calls(), 0);

        let patches = h.objects.status_patches();
        assert_eq!(patches.len(), 1);
        let deployment = condition(&patches[0].1, "DeploymentAvailable");
        assert_eq!(deployment["status"], "False");
        assert_eq!(deployment["reason"], "MinimumReplicasUnavailable");
        let ready = condition(&patches[0].1, "Ready");
        assert_eq!(ready["status"], "False");
        assert_eq!(ready["reason"], "MinimumReplicasUnavailable");
    }

    #[tokio::test]
    async fn test_finalizer_is_added_first() {
        let h = harness();
        let getter = MockClientGetter::new();
        let mut src = new_azure_event_grid_source("testns", "test");
        src.metadata.finalizers = None;
        src.metadata.resource_version = Some("7".to_string());
        let reconciler = source_reconciler(&h, &getter, vec![src]);

        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::requeue(Duration::from_secs(1)));
        assert_eq!(
            h.objects.metadata_patches(),
            [(
                "testns/test".to_string(),
                json!({"metadata": {
                    "finalizers": ["azureeventgridsources.sources.triggermesh.io"],
                    "resourceVersion": "7"
                }})
            )]
        );
        assert_eq!(h.recorder.events(), ["Normal FinalizerUpdate Updated \"test\" finalizers"]);
        assert_eq!(getter.subscriptions.get_calls(), 0);
        assert!(h.objects.status_patches().is_empty());
    }

    #[tokio::test]
    async fn test_deletion_removes_subscription_then_finalizer() {
        let h = harness();
        let getter = MockClientGetter::new();
        let src = seed_in_sync_source(&h, &getter).await;
        let reconciler = source_reconciler(&h, &getter, vec![deleted(src)]);

        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::await_change());
        assert!(getter
            .subscriptions
            .subscription(TEST_SCOPE, "io.triggermesh.azureeventgridsources.testns.test")
            .is_none());
        assert_eq!(
            h.objects.metadata_patches(),
            [(
                "testns/test".to_string(),
                json!({"metadata": {"finalizers": [], "resourceVersion": ""}})
            )]
        );
        assert_eq!(
            h.recorder.events(),
            [
                format!(
                    "Normal Unsubscribed Deleted event subscription \"io.triggermesh.azureeventgridsources.testns.test\" for Azure resource {:?}",
                    TEST_SCOPE
                ),
                "Normal FinalizerUpdate Updated \"test\" finalizers".to_string(),
            ]
        );
        assert!(h.objects.status_patches().is_empty());
        assert_eq!(getter.subscriptions.get_calls(), 0);
        assert_eq!(getter.subscriptions.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_deletion_of_missing_subscription() {
        let h = harness();
        let getter = MockClientGetter::new();
        let src = deleted(new_azure_event_grid_source("testns", "test"));
        let reconciler = source_reconciler(&h, &getter, vec![src]);

        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::await_change());
        assert_eq!(
            h.recorder.events(),
            [
                "Warning Unsubscribed Event subscription not found, skipping deletion",
                "Normal FinalizerUpdate Updated \"test\" finalizers",
            ]
        );
        assert_eq!(h.objects.metadata_patches().len(), 1);
        assert_eq!(getter.subscriptions.get_calls(), 0);
        assert_eq!(getter.subscriptions.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_deletion_with_invalid_scope_releases_finalizer() {
        let h = harness();
        let getter = MockClientGetter::new();
        let mut src = new_azure_event_grid_source("testns", "test");
        src.spec.scope = "subscriptions/s/resourceGroups/g".to_string();
        let reconciler = source_reconciler(&h, &getter, vec![deleted(src)]);

        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::await_change());
        assert_eq!(getter.subscriptions.delete_calls(), 0);
        assert_eq!(h.objects.metadata_patches().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_finalizer() {
        let h = harness();
        let getter = MockClientGetter::failing("invalid client secret");
        let src = deleted(new_azure_event_grid_source("testns", "test"));
        let reconciler = source_reconciler(&h, &getter, vec![src]);

        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::requeue(Duration::from_secs(5)));

        assert!(h.objects.metadata_patches().is_empty());
        assert_eq!(
            h.recorder.events(),
            ["Warning FailedUnsubscribe Failed to clean up: Invalid configuration: invalid client secret"]
        );
        let patches = h.objects.status_patches();
        assert_eq!(patches.len(), 1);
        let subscribed = condition(&patches[0].1, "Subscribed");
        assert_eq!(subscribed["status"], "False");
        assert_eq!(subscribed["reason"], "FailedUnsubscribe");
    }

    #[tokio::test]
    async fn test_repeated_cleanup_failure_is_not_reannounced() {
        let first = harness();
        let getter = MockClientGetter::failing("invalid client secret");
        let src = deleted(new_azure_event_grid_source("testns", "test"));
        source_reconciler(&first, &getter, vec![src.clone()])
            .reconcile("testns", "test")
            .await
            .unwrap();
        let written = first.objects.status_patches()[0].1.clone();

        let h = harness();
        let reconciler = source_reconciler(&h, &getter, vec![with_written_status(src, &written)]);
        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::requeue(Duration::from_secs(5)));
        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::requeue(Duration::from_secs(10)));

        assert!(h.recorder.events().is_empty());
        assert!(h.objects.status_patches().is_empty());
        assert!(h.objects.metadata_patches().is_empty());
    }

    #[tokio::test]
    async fn test_deletion_without_finalizer_skips_cleanup() {
        let h = harness();
        let getter = MockClientGetter::new();
        let mut src = deleted(new_azure_event_grid_source("testns", "test"));
        src.metadata.finalizers = Some(vec!["someone.else/cleanup".to_string()]);
        let reconciler = source_reconciler(&h, &getter, vec![src]);

        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::await_change());
        assert_eq!(getter.subscriptions.delete_calls(), 0);
        assert!(h.objects.metadata_patches().is_empty());
        assert_eq!(
            h.recorder.events(),
            ["Warning FinalizerMissing Finalizer \"azureeventgridsources.sources.triggermesh.io\" is not set, skipping cleanup"]
        );
    }

    #[tokio::test]
    async fn test_new_source_is_fully_provisioned() {
        let h = harness();
        let getter = MockClientGetter::new();
        let src = new_azure_event_grid_source("testns", "test");
        let reconciler = source_reconciler(&h, &getter, vec![src]);

        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::await_change());

        assert!(h
            .cluster
            .workload(WorkloadKind::Deployment, "testns", "azureeventgridsource-test")
            .is_some());
        assert_eq!(h.cluster.role_binding_creates(), 1);
        assert_eq!(getter.subscriptions.get_calls(), 1);
        assert_eq!(getter.subscriptions.create_or_update_calls(), 1);
        assert_eq!(
            h.recorder.events(),
            [
                "Normal AdapterCreated Created adapter Deployment \"azureeventgridsource-test\"".to_string(),
                format!(
                    "Normal Subscribed Created event subscription \"io.triggermesh.azureeventgridsources.testns.test\" for Azure resource {:?}",
                    TEST_SCOPE
                ),
            ]
        );

        let patches = h.objects.status_patches();
        assert_eq!(patches.len(), 1);
        let (key, patch) = &patches[0];
        assert_eq!(key, "testns/test");
        let status = &patch["status"];
        assert_eq!(status["observedGeneration"], 1);
        assert_eq!(status["sinkUri"], TEST_SINK_URI);
        assert_eq!(status["eventHubID"], format!("{}/eventhubs/MyEventHub", TEST_EVENT_HUBS_NAMESPACE));
        assert!(status.get("eventSubscriptionID").is_none());

        let condition = |type_: &str| {
            status["conditions"]
                .as_array()
                .and_then(|conds| conds.iter().find(|c| c["type"] == type_))
                .map(|c| c["status"].clone())
        };
        assert_eq!(condition("SinkProvided"), Some(json!("True")));
        assert_eq!(condition("Subscribed"), Some(json!("True")));
        // The fake cluster reports no availability for new workloads yet
        assert_eq!(condition("DeploymentAvailable"), Some(json!("Unknown")));
        assert_eq!(condition("Ready"), Some(json!("Unknown")));
    }

    #[tokio::test]
    async fn test_unresolved_sink_is_reported() {
        let h = harness();
        let getter = MockClientGetter::new();
        let mut src = new_azure_event_grid_source("testns", "test");
        src.spec.sink = Destination::from_ref(KReference {
            api_version: "eventing.knative.dev/v1".to_string(),
            kind: "Broker".to_string(),
            name: "default".to_string(),
            namespace: None,
        });
        let reconciler = source_reconciler(&h, &getter, vec![src]);

        let err = reconciler.reconcile("testns", "test").await.unwrap_err();
        assert!(matches!(err, ControllerError::SinkNotResolved(_)));
        assert_eq!(h.cluster.workload_creates(), 0);
        assert_eq!(getter.subscriptions.get_calls(), 0);

        let patches = h.objects.status_patches();
        assert_eq!(patches.len(), 1);
        let sink = patches[0].1["status"]["conditions"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["type"] == CONDITION_SINK_PROVIDED)
            .cloned()
            .unwrap();
        assert_eq!(sink["status"], ConditionStatus::False.as_str());
        assert_eq!(sink["reason"], "NotFound");

        assert_eq!(
            reconciler.error_action("testns/test", &err),
            Action::requeue(Duration::from_secs(5))
        );
    }

    #[tokio::test]
    async fn test_invalid_spec_waits_for_a_change() {
        let h = harness();
        let getter = MockClientGetter::new();
        let mut src = new_azure_event_grid_source("testns", "test");
        src.spec.auth.service_principal = None;
        let reconciler = source_reconciler(&h, &getter, vec![src]);

        let err = reconciler.reconcile("testns", "test").await.unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
        assert_eq!(reconciler.error_action("testns/test", &err), Action::await_change());
        assert!(h.recorder.events()[0].starts_with("Warning FailedAdapter Failed to reconcile adapter:"));
        assert_eq!(getter.subscriptions.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_repeated_adapter_failure_is_not_reannounced() {
        let first = harness();
        let getter = MockClientGetter::new();
        let mut src = new_azure_event_grid_source("testns", "test");
        src.spec.auth.service_principal = None;
        assert!(source_reconciler(&first, &getter, vec![src.clone()])
            .reconcile("testns", "test")
            .await
            .is_err());
        let written = first.objects.status_patches()[0].1.clone();
        assert_eq!(condition(&written, "DeploymentAvailable")["reason"], "FailedAdapter");

        let h = harness();
        let reconciler = source_reconciler(&h, &getter, vec![with_written_status(src, &written)]);
        let err = reconciler.reconcile("testns", "test").await.unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
        assert!(h.recorder.events().is_empty());
        assert!(h.objects.status_patches().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_scope_is_reported_on_the_object() {
        let h = harness();
        let getter = MockClientGetter::new();
        h.cluster.set_availability(Some(available()));
        let mut src = new_azure_event_grid_source("testns", "test");
        src.spec.scope = "subscriptions/s/resourceGroups/g".to_string();
        let reconciler = source_reconciler(&h, &getter, vec![src]);

        let err = reconciler.reconcile("testns", "test").await.unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
        assert_eq!(reconciler.error_action("testns/test", &err), Action::await_change());
        assert_eq!(getter.subscriptions.get_calls(), 0);

        let patches = h.objects.status_patches();
        assert_eq!(patches.len(), 1);
        let subscribed = condition(&patches[0].1, "Subscribed");
        assert_eq!(subscribed["status"], "False");
        assert_eq!(subscribed["reason"], "FailedSubscribe");
        assert_eq!(condition(&patches[0].1, "Ready")["status"], "False");
        assert_eq!(condition(&patches[0].1, "DeploymentAvailable")["status"], "True");

        let events = h.recorder.events();
        assert_eq!(events.len(), 2);
        assert!(events[1].starts_with("Warning FailedSubscribe Failed to reconcile event subscription:"));
    }

    #[tokio::test]
    async fn test_dataweave_transformation() {
        let h = harness();
        h.cluster.set_availability(Some(available()));
        let reconciler = reconciler(
            &h,
            vec![new_dataweave_transformation("testns", "test")],
            Arc::new(DataWeaveAdapterBuilder::new("dw:v1", ObservabilityConfig::default())),
        );

        let action = reconciler.reconcile("testns", "test").await.unwrap();
        assert_eq!(action, Action::await_change());

        // No external state, hence no finalizer
        assert!(h.objects.metadata_patches().is_empty());
        assert!(h
            .cluster
            .workload(WorkloadKind::KnativeService, "testns", "dataweavetransformation-test")
            .is_some());
        assert_eq!(h.cluster.service_account_creates(), 0);
        assert_eq!(
            h.recorder.events(),
            ["Normal AdapterCreated Created adapter Knative Service \"dataweavetransformation-test\""]
        );

        let patches = h.objects.status_patches();
        assert_eq!(patches.len(), 1);
        let ready = patches[0].1["status"]["conditions"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["type"] == "Ready")
            .cloned()
            .unwrap();
        assert_eq!(ready["status"], "True");

        let deleting: DataWeaveTransformation = {
            let mut trn = new_dataweave_transformation("testns", "gone");
            trn.metadata.deletion_timestamp = Some(serde_json::from_value(json!("2024-01-01T00:00:00Z")).unwrap());
            trn
        };
        let reconciler = reconciler_for_deleted_transformation(&h, deleting);
        assert_eq!(reconciler.reconcile("testns", "gone").await.unwrap(), Action::await_change());
        assert!(h.objects.metadata_patches().is_empty());
    }

    fn reconciler_for_deleted_transformation(
        h: &Harness,
        trn: DataWeaveTransformation,
    ) -> Reconciler<DataWeaveTransformation> {
        reconciler(
            h,
            vec![trn],
            Arc::new(DataWeaveAdapterBuilder::new("dw:v1", ObservabilityConfig::default())),
        )
    }
}
