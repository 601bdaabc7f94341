//! Controller-specific error types.
//!
//! This module defines the errors surfaced by reconcilers and the
//! classification the watcher error policy uses to pick a requeue strategy.

use eventgrid_client::EventGridError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the TriggerMesh controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Azure Resource Manager error
    #[error("Azure error: {0}")]
    EventGrid(#[from] EventGridError),

    /// Invalid configuration, either of the controller or of a declared resource
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The sink could not be resolved to a URI (yet)
    #[error("Sink not resolved: {0}")]
    SinkNotResolved(String),

    /// A referenced secret or secret key does not exist
    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    /// The controller is shutting down
    #[error("Reconciliation cancelled")]
    Cancelled,

    /// Invariant violation, including panics caught inside a reconcile
    #[error("Internal error: {0}")]
    Internal(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

/// How an error affects the retry strategy of a reconcile key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Target absent; usually a no-op
    NotFound,
    /// Network, conflict or throttling; retried with backoff
    Transient,
    /// The declared resource must change before a retry can succeed
    PermanentConfig,
    /// Bug or invariant violation; retried with backoff
    Programmer,
}

impl ControllerError {
    /// Classifies the error.
    pub fn class(&self) -> ErrorClass {
        match self {
            ControllerError::Kube(KubeError::Api(response)) => match response.code {
                404 => ErrorClass::NotFound,
                409 | 429 => ErrorClass::Transient,
                code if code >= 500 => ErrorClass::Transient,
                _ => ErrorClass::PermanentConfig,
            },
            ControllerError::Kube(_) => ErrorClass::Transient,
            ControllerError::EventGrid(e) if e.is_not_found() => ErrorClass::NotFound,
            ControllerError::EventGrid(e) if e.is_transient() => ErrorClass::Transient,
            ControllerError::EventGrid(EventGridError::Serialization(_)) => ErrorClass::Programmer,
            ControllerError::EventGrid(_) => ErrorClass::PermanentConfig,
            ControllerError::InvalidConfig(_) | ControllerError::SecretNotFound(_) => {
                ErrorClass::PermanentConfig
            }
            ControllerError::SinkNotResolved(_)
            | ControllerError::Cancelled
            | ControllerError::Watch(_) => ErrorClass::Transient,
            ControllerError::Internal(_) | ControllerError::Serialization(_) => ErrorClass::Programmer,
        }
    }

    /// Whether the error is the platform or provider reporting a missing target.
    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn api_error(code: u16) -> ControllerError {
        ControllerError::Kube(KubeError::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("status {}", code),
            reason: "Test".to_string(),
            code,
        }))
    }

    #[test]
    fn test_kube_error_classes() {
        assert_eq!(api_error(404).class(), ErrorClass::NotFound);
        assert_eq!(api_error(409).class(), ErrorClass::Transient);
        assert_eq!(api_error(503).class(), ErrorClass::Transient);
        assert_eq!(api_error(422).class(), ErrorClass::PermanentConfig);
    }

    #[test]
    fn test_provider_error_classes() {
        let not_found = ControllerError::from(EventGridError::NotFound("sub".to_string()));
        assert!(not_found.is_not_found());

        let throttled = ControllerError::from(EventGridError::Api {
            status: 429,
            message: "slow down".to_string(),
        });
        assert_eq!(throttled.class(), ErrorClass::Transient);

        let auth = ControllerError::from(EventGridError::Authentication("bad secret".to_string()));
        assert_eq!(auth.class(), ErrorClass::PermanentConfig);
    }

    #[test]
    fn test_controller_error_classes() {
        assert_eq!(
            ControllerError::SecretNotFound("ns/azure".to_string()).class(),
            ErrorClass::PermanentConfig
        );
        assert_eq!(
            ControllerError::SinkNotResolved("broker".to_string()).class(),
            ErrorClass::Transient
        );
        assert_eq!(ControllerError::Internal("panic".to_string()).class(), ErrorClass::Programmer);
    }
}
