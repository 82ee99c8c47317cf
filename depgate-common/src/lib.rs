// depgate-common/src/lib.rs
pub mod config;
pub mod dependency;
pub mod error;
pub mod logging;
pub mod registry;

// Re-export key types
pub use config::Config;
pub use dependency::{Dependency, DependencyKind, Outcome, Settlement, Settler, WaitCondition};
pub use error::{Abandoned, Cause, GateError, Reason, Result};
pub use registry::{Instance, InstanceRegistry, Lookup, Token};
