// depgate-core/src/lib.rs

mod handle;
mod join;
pub mod resolver;

// Re-export key types for callers gating stores and actions
pub use handle::ResolutionHandle;
pub use resolver::{DependencyResolver, Resolution};
