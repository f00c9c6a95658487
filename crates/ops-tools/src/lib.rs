//! ops-tools: Operation Catalog and Dispatch
//!
//! Maps an agent-issued `(action group, api path, parameters)` triple onto one
//! of the operations in [`operation::Operation`], calls the injected backend
//! ports and reshapes their responses into flat JSON.

pub mod backend;
pub mod normalize;
pub mod operation;
pub mod params;
pub mod registry;
pub mod router;
pub mod stub;

// Re-export main types
pub use backend::Backends;
pub use operation::{ActionGroup, Category, Operation};
pub use params::{ParamKind, ParamSpec, Params};
pub use registry::{CapabilityRegistry, RegistryEntry};
pub use router::{ActionRouter, PollConfig, RouterConfig};
