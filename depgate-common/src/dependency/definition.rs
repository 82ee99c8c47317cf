// depgate-common/src/dependency/definition.rs
use std::any::Any;
use std::fmt;

use super::outcome::Outcome;
use crate::error::Result;
use crate::registry::{Instance, Lookup, Token};

type BoundCheck = Box<dyn FnOnce(&Instance) -> Result<Outcome> + Send>;
type ActionCheck = Box<dyn FnOnce() -> Outcome + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Checked against a live instance obtained through a `Lookup`.
    Store,
    /// Checked on its own.
    Action,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store => write!(f, "store"),
            Self::Action => write!(f, "action"),
        }
    }
}

enum Check {
    Store { token: Token, check: BoundCheck },
    Action { check: ActionCheck },
}

/// One declared dependency: what it refers to, and how to tell whether it is satisfied.
pub struct Dependency {
    label: String,
    check: Check,
}

impl Dependency {
    /// A dependency on the live instance of `S`.
    pub fn store<S, F, O>(check: F) -> Self
    where
        S: Any + Send + Sync,
        F: FnOnce(&S) -> O + Send + 'static,
        O: Into<Outcome>,
    {
        Self::bound::<S, _>(move |store| check(store).into())
    }

    /// Like `store`, for checks whose return type is only known at runtime.
    pub fn store_untyped<S, F, T>(check: F) -> Self
    where
        S: Any + Send + Sync,
        F: FnOnce(&S) -> T + Send + 'static,
        T: Any + Send,
    {
        Self::bound::<S, _>(move |store| Outcome::classify(check(store)))
    }

    fn bound<S, F>(check: F) -> Self
    where
        S: Any + Send + Sync,
        F: FnOnce(&S) -> Outcome + Send + 'static,
    {
        let token = Token::of::<S>();
        Self {
            label: token.short_name().to_string(),
            check: Check::Store {
                token,
                check: Box::new(move |instance: &Instance| {
                    let store = instance.downcast_ref::<S>()?;
                    Ok(check(store))
                }),
            },
        }
    }

    /// A self-contained dependency, labelled `name` in errors and logs.
    pub fn action<F, O>(name: impl Into<String>, check: F) -> Self
    where
        F: FnOnce() -> O + Send + 'static,
        O: Into<Outcome>,
    {
        Self {
            label: name.into(),
            check: Check::Action {
                check: Box::new(move || check().into()),
            },
        }
    }

    pub fn action_untyped<F, T>(name: impl Into<String>, check: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
        T: Any + Send,
    {
        Self {
            label: name.into(),
            check: Check::Action {
                check: Box::new(move || Outcome::classify(check())),
            },
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> DependencyKind {
        match self.check {
            Check::Store { .. } => DependencyKind::Store,
            Check::Action { .. } => DependencyKind::Action,
        }
    }

    pub fn token(&self) -> Option<&Token> {
        match &self.check {
            Check::Store { token, .. } => Some(token),
            Check::Action { .. } => None,
        }
    }

    /// Runs the check. Store dependencies look their instance up first; a failed
    /// lookup is returned as-is and the check is not run.
    pub fn evaluate(self, lookup: &dyn Lookup) -> Result<Outcome> {
        match self.check {
            Check::Store { token, check } => {
                let instance = lookup.lookup(&token)?;
                check(&instance)
            }
            Check::Action { check } => Ok(check()),
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("label", &self.label)
            .field("kind", &self.kind())
            .field("token", &self.token())
            .finish()
    }
}
