//! Event source CRDs (`sources.triggermesh.io`)

pub mod azure_event_grid_source;

pub use azure_event_grid_source::*;
