//! Flow CRDs (`flow.triggermesh.io`)
//!
//! Transformations applied to events in transit.

pub mod dataweave_transformation;

pub use dataweave_transformation::*;
