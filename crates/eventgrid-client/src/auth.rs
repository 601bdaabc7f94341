//! Entra ID (Azure AD) authentication
//!
//! Acquires ARM access tokens with the OAuth2 client credentials flow and
//! caches them until shortly before they expire.

use crate::error::EventGridError;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Public cloud Resource Manager endpoint
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// Public cloud Entra ID authority
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

// Tokens are refreshed this long before their advertised expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(120);

/// Credentials of a service principal
#[derive(Clone, PartialEq, Eq)]
pub struct ServicePrincipalCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ServicePrincipalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicePrincipalCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Base URLs of the Azure cloud in use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureEndpoints {
    /// Resource Manager endpoint (e.g. "https://management.azure.com")
    pub management: String,
    /// Entra ID authority host (e.g. "https://login.microsoftonline.com")
    pub authority_host: String,
}

impl Default for AzureEndpoints {
    fn default() -> Self {
        Self {
            management: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Token source backed by a client secret
#[derive(Debug)]
pub struct ClientSecretCredential {
    client: Client,
    token_url: String,
    scope: String,
    credentials: ServicePrincipalCredentials,
    cache: Mutex<Option<CachedToken>>,
}

impl ClientSecretCredential {
    /// Create a credential issuing tokens for `endpoints.management`
    pub fn new(client: Client, endpoints: &AzureEndpoints, credentials: ServicePrincipalCredentials) -> Self {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            endpoints.authority_host.trim_end_matches('/'),
            urlencoding::encode(&credentials.tenant_id)
        );
        let scope = format!("{}/.default", endpoints.management.trim_end_matches('/'));

        Self {
            client,
            token_url,
            scope,
            credentials,
            cache: Mutex::new(None),
        }
    }

    /// Returns a valid access token, requesting a new one when the cached
    /// token is missing or about to expire.
    pub async fn token(&self) -> Result<String, EventGridError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() + EXPIRY_MARGIN < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        debug!("Requesting access token for client {}", self.credentials.client_id);
        let body = format!(
            "grant_type=client_credentials&client_id={}&client_secret={}&scope={}",
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&self.credentials.client_secret),
            urlencoding::encode(&self.scope),
        );

        let response = self
            .client
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await
            .map_err(EventGridError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EventGridError::Authentication(format!(
                "token request failed: {} - {}",
                status, body
            )));
        }

        let text = response.text().await?;
        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| EventGridError::Authentication(format!("invalid token response: {}", e)))?;

        let access_token = token.access_token;
        *cache = Some(CachedToken {
            token: access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(access_token)
    }
}
