pub mod definition;
pub mod outcome;

pub use definition::{Dependency, DependencyKind};
pub use outcome::{Outcome, Settlement, Settler, WaitCondition};
