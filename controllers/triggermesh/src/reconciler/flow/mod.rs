//! Flow kinds (`flow.triggermesh.io`).

pub mod dataweave;

pub use dataweave::DataWeaveAdapterBuilder;
