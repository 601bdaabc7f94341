//! Azure Event Grid REST API Client
//!
//! A Rust client for the subset of the Azure Resource Manager (ARM) API the
//! TriggerMesh controller needs: Event Grid event subscriptions and the
//! Event Hubs they deliver into.
//!
//! # Example
//!
//! ```no_run
//! use eventgrid_client::{
//!     AzureEndpoints, EventSubscriptionsClient, EventSubscriptionsClientTrait,
//!     ServicePrincipalCredentials,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let creds = ServicePrincipalCredentials {
//!     tenant_id: "00000000-0000-0000-0000-000000000000".to_string(),
//!     client_id: "00000000-0000-0000-0000-000000000000".to_string(),
//!     client_secret: "secret".to_string(),
//! };
//! let client = EventSubscriptionsClient::new(AzureEndpoints::default(), creds)?;
//!
//! let scope = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/MyGroup";
//! let sub = client.get(scope, "my-subscription").await?;
//! println!("{:?}", sub.id);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod eventgrid_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use auth::{
    AzureEndpoints, ClientSecretCredential, ServicePrincipalCredentials, DEFAULT_AUTHORITY_HOST,
    DEFAULT_MANAGEMENT_ENDPOINT,
};
pub use client::{EventHubsClient, EventSubscriptionsClient};
pub use common::HttpClient;
pub use error::EventGridError;
pub use eventgrid_trait::{EventHubsClientTrait, EventSubscriptionsClientTrait};
pub use models::*;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockEventHubsClient, MockEventSubscriptionsClient};
