//! DataWeaveTransformation adapter, run as a Knative Service.

use crate::config::ObservabilityConfig;
use crate::error::ControllerError;
use crate::reconciler::adapter::{env_value, new_adapter_spec, value_from_env, AdapterBuilder, WorkloadKind, WorkloadSpec};
use crds::DataWeaveTransformation;

pub const ENV_DWSPELL: &str = "DATAWEAVETRANSFORMATION_DWSPELL";
pub const ENV_INCOMING_CONTENT_TYPE: &str = "DATAWEAVETRANSFORMATION_INCOMING_CONTENT_TYPE";
pub const ENV_OUTPUT_CONTENT_TYPE: &str = "DATAWEAVETRANSFORMATION_OUTPUT_CONTENT_TYPE";

const METRICS_DOMAIN: &str = "triggermesh.io/flow";

#[derive(Debug, Clone)]
pub struct DataWeaveAdapterBuilder {
    image: String,
    observability: ObservabilityConfig,
}

impl DataWeaveAdapterBuilder {
    pub fn new(image: impl Into<String>, observability: ObservabilityConfig) -> Self {
        Self {
            image: image.into(),
            observability,
        }
    }
}

impl AdapterBuilder<DataWeaveTransformation> for DataWeaveAdapterBuilder {
    fn build_adapter(&self, trn: &DataWeaveTransformation, sink_uri: &str) -> Result<WorkloadSpec, ControllerError> {
        let env = vec![
            value_from_env(ENV_DWSPELL, &trn.spec.dw_spell)?,
            env_value(ENV_INCOMING_CONTENT_TYPE, trn.spec.incoming_content_type.clone()),
            env_value(ENV_OUTPUT_CONTENT_TYPE, trn.spec.output_content_type.clone()),
        ];

        new_adapter_spec(
            trn,
            WorkloadKind::KnativeService,
            &self.image,
            sink_uri,
            env,
            &self.observability,
            METRICS_DOMAIN,
        )
    }
}
