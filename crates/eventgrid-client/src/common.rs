//! Common utilities for the ARM client
//!
//! Provides the authenticated HTTP wrapper shared by every resource client.

use crate::auth::{AzureEndpoints, ClientSecretCredential, ServicePrincipalCredentials};
use crate::error::EventGridError;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Header carrying the URL to poll for the outcome of a long-running operation
pub const HEADER_ASYNC_OPERATION: &str = "Azure-AsyncOperation";

#[derive(Debug, Deserialize)]
struct ArmErrorResponse {
    error: ArmErrorBody,
}

#[derive(Debug, Deserialize)]
struct ArmErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Response of a PUT on an ARM resource
#[derive(Debug)]
pub struct PutResponse<T> {
    /// Resource representation, when ARM returned one
    pub body: Option<T>,
    /// Polling URL when the operation completes asynchronously
    pub async_operation: Option<String>,
}

/// HTTP client wrapper with bearer authentication
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    credential: Arc<ClientSecretCredential>,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, credential: Arc<ClientSecretCredential>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
        }
    }

    /// Create a wrapper authenticating against `endpoints` as the given
    /// service principal
    pub fn connect(endpoints: &AzureEndpoints, credentials: ServicePrincipalCredentials) -> Result<Self, EventGridError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(EventGridError::Http)?;

        let credential = Arc::new(ClientSecretCredential::new(client.clone(), endpoints, credentials));
        Ok(Self::new(client, endpoints.management.clone(), credential))
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a resource path and API version
    pub fn build_url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.base_url,
            path,
            urlencoding::encode(api_version)
        )
    }

    async fn auth_header(&self) -> Result<String, EventGridError> {
        Ok(format!("Bearer {}", self.credential.token().await?))
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<T, EventGridError> {
        let url = self.build_url(path, api_version);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header().await?)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(EventGridError::Http)?;

        let response = check_status("GET", path, response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Make a PUT request
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<PutResponse<T>, EventGridError> {
        let url = self.build_url(path, api_version);
        let body = serde_json::to_value(body)?;
        debug!("PUT {} with body: {}", url, body);

        let response = self
            .client
            .put(&url)
            .header("Authorization", self.auth_header().await?)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(EventGridError::Http)?;

        let response = check_status("PUT", path, response).await?;
        let async_operation = response
            .headers()
            .get(HEADER_ASYNC_OPERATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text)?)
        };

        Ok(PutResponse { body, async_operation })
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str, api_version: &str) -> Result<(), EventGridError> {
        let url = self.build_url(path, api_version);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header().await?)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(EventGridError::Http)?;

        // ARM answers 204 when the resource is already gone
        if response.status() == StatusCode::NO_CONTENT {
            return Err(EventGridError::NotFound(path.to_string()));
        }

        check_status("DELETE", path, response).await?;
        Ok(())
    }
}

/// Maps non-success responses to the matching error variant.
async fn check_status(method: &str, path: &str, response: Response) -> Result<Response, EventGridError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ArmErrorResponse>(&body) {
        Ok(err) => format!("{}: {}", err.error.code, err.error.message),
        Err(_) => body,
    };

    Err(match status {
        StatusCode::NOT_FOUND => EventGridError::NotFound(format!("{} {}: {}", method, path, message)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            EventGridError::Authentication(format!("{} {}: {}", method, path, message))
        }
        StatusCode::BAD_REQUEST => EventGridError::InvalidRequest(format!("{} {}: {}", method, path, message)),
        _ => EventGridError::Api {
            status: status.as_u16(),
            message: format!("{} {} failed: {}", method, path, message),
        },
    })
}
