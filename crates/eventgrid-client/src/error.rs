//! Azure client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Azure Resource Manager API
#[derive(Debug, Error)]
pub enum EventGridError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// ARM returned an error status
    #[error("Azure API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token acquisition failed or the principal lacks permissions
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (rejected by ARM with 400, or invalid client input)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl EventGridError {
    /// Whether the error is an HTTP 404 from the provider.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EventGridError::NotFound(_))
    }

    /// Whether retrying the same request later may succeed.
    ///
    /// Network failures, conflicts, throttling and server errors are transient.
    pub fn is_transient(&self) -> bool {
        match self {
            EventGridError::Http(_) => true,
            EventGridError::Api { status, .. } => *status == 409 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
