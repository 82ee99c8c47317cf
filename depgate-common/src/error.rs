use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Failure value carried by an async dependency. Shared so `GateError` stays `Clone`.
pub type Cause = Arc<dyn StdError + Send + Sync>;

#[derive(Error, Debug, Clone)]
pub enum GateError {
    #[error("Dependency Unsatisfied: '{dependency}' (position {index}) reported false")]
    DependencyUnsatisfied { index: usize, dependency: String },

    #[error("Invalid Outcome Type: '{dependency}' (position {index}) returned {type_name}")]
    InvalidOutcomeType {
        index: usize,
        dependency: String,
        type_name: &'static str,
    },

    #[error("Async Dependency Failed: {0}")]
    AsyncDependencyFailed(Cause),

    #[error("Instance Not Found: {0}")]
    InstanceNotFound(String),

    #[error("Instance Mismatch: expected {expected}, found {found}")]
    InstanceMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),
}

impl GateError {
    pub fn async_failed<E>(cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        GateError::AsyncDependencyFailed(Arc::new(cause))
    }

    /// Message text callers matched on before the failures were split into variants.
    pub fn legacy_message(&self) -> Option<&'static str> {
        match self {
            GateError::DependencyUnsatisfied { .. } => Some("Could not solve dependency"),
            GateError::InvalidOutcomeType { .. } => Some("Invalid return type from dependency"),
            _ => None,
        }
    }

    /// The failure value of an async dependency, exactly as the wait-condition reported it.
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            GateError::AsyncDependencyFailed(cause) => Some(cause),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GateError {
    fn from(err: std::io::Error) -> Self {
        GateError::Io(Arc::new(err))
    }
}

/// Cause reported when the producer of a wait-condition goes away without settling it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("wait condition abandoned before it settled")]
pub struct Abandoned;

/// Plain-text cause, for producers that only have a message to report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct Reason(pub String);

impl From<&str> for Reason {
    fn from(s: &str) -> Self {
        Reason(s.to_string())
    }
}

impl From<String> for Reason {
    fn from(s: String) -> Self {
        Reason(s)
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
