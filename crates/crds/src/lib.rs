//! TriggerMesh CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the TriggerMesh controllers,
//! organized by API group:
//! - `sources`: event sources (`sources.triggermesh.io`)
//! - `flow`: transformations (`flow.triggermesh.io`)
//! - `common`: types shared by every kind (conditions, sink, secrets, Azure IDs)

pub mod common;
pub mod flow;
pub mod reconcilable;
pub mod sources;

pub use common::*;
pub use flow::*;
pub use reconcilable::Reconcilable;
pub use sources::*;
