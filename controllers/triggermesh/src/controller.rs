//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires one
//! `kube_runtime::Controller` per declared kind to its reconciler and runs
//! them until shutdown.

use crate::cluster::{ClusterClient, KubeCluster, KubeObjectClient};
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::events::{EventRecorder, KubeEventRecorder};
use crate::lister::Lister;
use crate::manifests;
use crate::reconciler::flow::DataWeaveAdapterBuilder;
use crate::reconciler::sources::{
    AzureEventGridAdapterBuilder, AzureEventGridSubscriptionReconciler, CredentialsClientGetter,
};
use crate::reconciler::Reconciler;
use crate::shutdown::ShutdownSignal;
use crate::watcher::watch_resource;
use crds::{AzureEventGridSource, DataWeaveTransformation};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::NamespaceResourceScope;
use kube::api::DynamicObject;
use kube::core::ApiResource;
use kube::{Api, Client, Resource};
use kube_runtime::watcher;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for TriggerMesh sources and transformations.
pub struct Controller {
    azure_event_grid_source_watcher: JoinHandle<Result<(), ControllerError>>,
    dataweave_transformation_watcher: JoinHandle<Result<(), ControllerError>>,
    shutdown: ShutdownSignal,
}

fn namespaced_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

fn dynamic_api(client: &Client, namespace: Option<&str>, resource: &ApiResource) -> Api<DynamicObject> {
    match namespace {
        Some(ns) => Api::namespaced_with(client.clone(), ns, resource),
        None => Api::all_with(client.clone(), resource),
    }
}

impl Controller {
    /// Creates a new controller instance and starts its watchers.
    pub async fn new(config: ControllerConfig, shutdown: ShutdownSignal) -> Result<Self, ControllerError> {
        info!("Initializing TriggerMesh controller");

        let client = Client::try_default().await?;
        let cluster: Arc<dyn ClusterClient> = Arc::new(KubeCluster::new(client.clone()));
        let recorder: Arc<dyn EventRecorder> = Arc::new(KubeEventRecorder::new(client.clone()));
        let namespace = config.namespace.as_deref();

        // AzureEventGridSource: adapter Deployment plus Azure subscription
        let controller = kube_runtime::Controller::new(
            namespaced_api::<AzureEventGridSource>(&client, namespace),
            watcher::Config::default(),
        )
        .owns(namespaced_api::<Deployment>(&client, namespace), watcher::Config::default());
        let reconciler = Reconciler::new(
            Lister::new(controller.store()),
            Arc::new(AzureEventGridAdapterBuilder::new(
                config.azure_event_grid_source_image.clone(),
                config.observability.clone(),
            )),
            cluster.clone(),
            Arc::new(KubeObjectClient::<AzureEventGridSource>::new(client.clone())),
            recorder.clone(),
            shutdown.clone(),
            &config,
        )
        .with_subscriptions(Arc::new(AzureEventGridSubscriptionReconciler::new(Arc::new(
            CredentialsClientGetter::new(cluster.clone(), config.azure_endpoints.clone()),
        ))));
        let azure_event_grid_source_watcher = tokio::spawn(watch_resource(
            controller,
            Arc::new(reconciler),
            config.workers,
            shutdown.clone(),
            "AzureEventGridSource",
        ));

        // DataWeaveTransformation: adapter Knative Service
        let ksvc = manifests::knative_service_resource();
        let controller = kube_runtime::Controller::new(
            namespaced_api::<DataWeaveTransformation>(&client, namespace),
            watcher::Config::default(),
        )
        .owns_with(dynamic_api(&client, namespace, &ksvc), ksvc.clone(), watcher::Config::default());
        let reconciler = Reconciler::new(
            Lister::new(controller.store()),
            Arc::new(DataWeaveAdapterBuilder::new(
                config.dataweave_transformation_image.clone(),
                config.observability.clone(),
            )),
            cluster,
            Arc::new(KubeObjectClient::<DataWeaveTransformation>::new(client.clone())),
            recorder,
            shutdown.clone(),
            &config,
        );
        let dataweave_transformation_watcher = tokio::spawn(watch_resource(
            controller,
            Arc::new(reconciler),
            config.workers,
            shutdown.clone(),
            "DataWeaveTransformation",
        ));

        Ok(Self {
            azure_event_grid_source_watcher,
            dataweave_transformation_watcher,
            shutdown,
        })
    }

    /// Runs the controller until shutdown.
    ///
    /// A watcher stopping before shutdown was requested is an error.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("TriggerMesh controller running");

        let source_first = tokio::select! {
            result = &mut self.azure_event_grid_source_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("AzureEventGridSource watcher panicked: {}", e)))??;
                true
            }
            result = &mut self.dataweave_transformation_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("DataWeaveTransformation watcher panicked: {}", e)))??;
                false
            }
        };

        if !self.shutdown.is_cancelled() {
            return Err(ControllerError::Watch("watcher stopped before shutdown".to_string()));
        }

        let (name, remaining) = if source_first {
            ("DataWeaveTransformation", self.dataweave_transformation_watcher)
        } else {
            ("AzureEventGridSource", self.azure_event_grid_source_watcher)
        };
        remaining
            .await
            .map_err(|e| ControllerError::Watch(format!("{} watcher panicked: {}", name, e)))??;

        info!("TriggerMesh controller stopped");
        Ok(())
    }
}
