//! DataWeaveTransformation CRD
//!
//! Transforms event payloads with a DataWeave script. The adapter runs as a
//! Knative Service.

use crate::common::{
    AdapterOverrides, Destination, SourceStatus, ValueFromField, CONDITION_DEPLOYMENT_AVAILABLE,
    CONDITION_SINK_PROVIDED,
};
use crate::reconcilable::Reconcilable;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "flow.triggermesh.io",
    version = "v1alpha1",
    kind = "DataWeaveTransformation",
    plural = "dataweavetransformations",
    namespaced,
    status = "DataWeaveTransformationStatus",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DataWeaveTransformationSpec {
    /// DataWeave script applied to each event
    pub dw_spell: ValueFromField,

    /// Content type of incoming events
    #[serde(default = "default_content_type")]
    pub incoming_content_type: String,

    /// Content type of produced events
    #[serde(default = "default_content_type")]
    pub output_content_type: String,

    /// Destination of the transformed events
    pub sink: Destination,

    /// Extra settings for the adapter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_overrides: Option<AdapterOverrides>,
}

fn default_content_type() -> String {
    "application/json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct DataWeaveTransformationStatus {
    #[serde(flatten)]
    pub source: SourceStatus,
}

impl Reconcilable for DataWeaveTransformation {
    type Status = DataWeaveTransformationStatus;

    const CONDITIONS: &'static [&'static str] = &[CONDITION_SINK_PROVIDED, CONDITION_DEPLOYMENT_AVAILABLE];

    fn sink(&self) -> &Destination {
        &self.spec.sink
    }

    fn adapter_overrides(&self) -> Option<&AdapterOverrides> {
        self.spec.adapter_overrides.as_ref()
    }

    fn status(&self) -> Option<&Self::Status> {
        self.status.as_ref()
    }

    fn status_mut(&mut self) -> &mut Self::Status {
        self.status.get_or_insert_with(Default::default)
    }

    fn source_status(&self) -> Option<&SourceStatus> {
        self.status.as_ref().map(|s| &s.source)
    }

    fn source_status_mut(&mut self) -> &mut SourceStatus {
        &mut self.status_mut().source
    }
}
