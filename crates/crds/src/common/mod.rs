//! Types shared by every TriggerMesh CRD.

pub mod azure;
pub mod conditions;
pub mod destination;
pub mod overrides;
pub mod status;
pub mod value_from;

pub use azure::*;
pub use conditions::*;
pub use destination::*;
pub use overrides::*;
pub use status::*;
pub use value_from::*;
