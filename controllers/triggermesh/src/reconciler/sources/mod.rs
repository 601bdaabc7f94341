//! Event source kinds (`sources.triggermesh.io`).

pub mod azure_event_grid;


pub use azure_event_grid::{
    AzureClients, AzureEventGridAdapterBuilder, AzureEventGridSubscriptionReconciler, ClientGetter,
    CredentialsClientGetter,
};
