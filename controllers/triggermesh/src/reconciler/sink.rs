//! Sink resolution.
//!
//! Turns a `Destination` into the URI the adapter delivers events to:
//! a direct URI is used as is, a core Service resolves to its cluster-local
//! DNS name, and any other object must be Addressable (`status.address.url`).

use crate::cluster::ClusterClient;
use crate::error::ControllerError;
use crate::reconciler::status::{REASON_SINK_MISSING, REASON_SINK_NOT_FOUND};
use crds::{Destination, KReference};
use std::sync::Arc;

/// Why a sink could not be resolved
#[derive(Debug)]
pub enum SinkError {
    /// Neither a reference nor a URI was given
    Missing,
    /// The referenced object does not exist or has no address yet
    NotFound(String),
    /// The destination is malformed
    Invalid(String),
    /// The lookup itself failed
    Lookup(ControllerError),
}

impl SinkError {
    /// Reason of the `SinkProvided=False` condition
    pub fn reason(&self) -> &'static str {
        match self {
            SinkError::Missing => REASON_SINK_MISSING,
            SinkError::NotFound(_) | SinkError::Lookup(_) => REASON_SINK_NOT_FOUND,
            SinkError::Invalid(_) => "InvalidSink",
        }
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Missing => f.write_str("The sink has neither a ref nor a uri"),
            SinkError::NotFound(msg) | SinkError::Invalid(msg) => f.write_str(msg),
            SinkError::Lookup(e) => write!(f, "Failed to look up the sink: {}", e),
        }
    }
}

impl From<SinkError> for ControllerError {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Missing | SinkError::Invalid(_) => ControllerError::InvalidConfig(err.to_string()),
            SinkError::NotFound(msg) => ControllerError::SinkNotResolved(msg),
            SinkError::Lookup(e) => e,
        }
    }
}

fn is_absolute(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

fn join(base: &str, path: Option<&str>) -> String {
    match path {
        Some(path) if !path.is_empty() => {
            format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
        }
        _ => base.to_string(),
    }
}

#[derive(Clone)]
pub struct SinkResolver {
    cluster: Arc<dyn ClusterClient>,
}

impl std::fmt::Debug for SinkResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkResolver").finish_non_exhaustive()
    }
}

impl SinkResolver {
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self { cluster }
    }

    /// Resolves `dest`, with references defaulting to `namespace`.
    pub async fn resolve(&self, namespace: &str, dest: &Destination) -> Result<String, SinkError> {
        match (&dest.reference, dest.uri.as_deref()) {
            (None, None) => Err(SinkError::Missing),
            (None, Some(uri)) if is_absolute(uri) => Ok(uri.to_string()),
            (None, Some(uri)) => Err(SinkError::Invalid(format!("The sink URI {:?} is not absolute", uri))),
            (Some(reference), path) => {
                let base = self.resolve_ref(namespace, reference).await?;
                Ok(join(&base, path))
            }
        }
    }

    async fn resolve_ref(&self, namespace: &str, reference: &KReference) -> Result<String, SinkError> {
        let ns = reference.namespace.as_deref().unwrap_or(namespace);
        let obj = self
            .cluster
            .get_addressable(ns, reference)
            .await
            .map_err(SinkError::Lookup)?
            .ok_or_else(|| {
                SinkError::NotFound(format!(
                    "{} {:?} not found in namespace {:?}",
                    reference.kind, reference.name, ns
                ))
            })?;

        if reference.group_version() == ("", "v1") && reference.kind == "Service" {
            return Ok(format!("http://{}.{}.svc.cluster.local/", reference.name, ns));
        }

        obj.pointer("/status/address/url")
            .and_then(serde_json::Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                SinkError::NotFound(format!(
                    "{} {:?} does not expose an address",
                    reference.kind, reference.name
                ))
            })
    }
}
