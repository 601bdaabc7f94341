//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use eventgrid_client::{AzureEndpoints, DEFAULT_AUTHORITY_HOST, DEFAULT_MANAGEMENT_ENDPOINT};
use std::env;

/// Default receive adapter image of AzureEventGridSource
pub const DEFAULT_AZUREEVENTGRIDSOURCE_IMAGE: &str =
    "gcr.io/triggermesh/azureeventgridsource-adapter:latest";

/// Default adapter image of DataWeaveTransformation
pub const DEFAULT_DATAWEAVETRANSFORMATION_IMAGE: &str =
    "gcr.io/triggermesh/dataweavetransformation-adapter:latest";

/// Observability settings passed through to every adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservabilityConfig {
    pub logging: Option<String>,
    pub metrics: Option<String>,
    pub tracing: Option<String>,
}

/// Configuration of the controller process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch; all namespaces when `None`
    pub namespace: Option<String>,
    /// Concurrent reconciles per kind
    pub workers: u16,
    pub backoff_base_seconds: u64,
    pub backoff_max_seconds: u64,
    pub azure_event_grid_source_image: String,
    pub dataweave_transformation_image: String,
    pub observability: ObservabilityConfig,
    pub azure_endpoints: AzureEndpoints,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            workers: 2,
            backoff_base_seconds: 5,
            backoff_max_seconds: 300,
            azure_event_grid_source_image: DEFAULT_AZUREEVENTGRIDSOURCE_IMAGE.to_string(),
            dataweave_transformation_image: DEFAULT_DATAWEAVETRANSFORMATION_IMAGE.to_string(),
            observability: ObservabilityConfig::default(),
            azure_endpoints: AzureEndpoints::default(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            namespace: non_empty("WATCH_NAMESPACE"),
            workers: parse_number(&lookup, "WORKERS", defaults.workers)?,
            backoff_base_seconds: parse_number(&lookup, "BACKOFF_BASE_SECONDS", defaults.backoff_base_seconds)?,
            backoff_max_seconds: parse_number(&lookup, "BACKOFF_MAX_SECONDS", defaults.backoff_max_seconds)?,
            azure_event_grid_source_image: non_empty("AZUREEVENTGRIDSOURCE_IMAGE")
                .unwrap_or(defaults.azure_event_grid_source_image),
            dataweave_transformation_image: non_empty("DATAWEAVETRANSFORMATION_IMAGE")
                .unwrap_or(defaults.dataweave_transformation_image),
            observability: ObservabilityConfig {
                logging: non_empty("K_LOGGING_CONFIG"),
                metrics: non_empty("K_METRICS_CONFIG"),
                tracing: non_empty("K_TRACING_CONFIG"),
            },
            azure_endpoints: AzureEndpoints {
                management: non_empty("AZURE_MANAGEMENT_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_MANAGEMENT_ENDPOINT.to_string()),
                authority_host: non_empty("AZURE_AUTHORITY_HOST")
                    .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
            },
        };

        if config.workers == 0 {
            return Err(ControllerError::InvalidConfig("WORKERS must be at least 1".to_string()));
        }
        if config.backoff_base_seconds > config.backoff_max_seconds {
            return Err(ControllerError::InvalidConfig(format!(
                "BACKOFF_BASE_SECONDS ({}) exceeds BACKOFF_MAX_SECONDS ({})",
                config.backoff_base_seconds, config.backoff_max_seconds
            )));
        }
        Ok(config)
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ControllerError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            ControllerError::InvalidConfig(format!("{} must be a non-negative integer, got {:?}", key, raw))
        }),
        _ => Ok(default),
    }
}
