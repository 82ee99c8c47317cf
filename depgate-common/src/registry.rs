// depgate-common/src/registry.rs
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{GateError, Result};

/// Identifies a dependency by the Rust type its live instance has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    id: TypeId,
    name: &'static str,
}

impl Token {
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path, used as a dependency label.
    pub fn short_name(&self) -> &'static str {
        let generic_start = self.name.find('<').unwrap_or(self.name.len());
        match self.name[..generic_start].rfind("::") {
            Some(pos) => &self.name[pos + 2..generic_start],
            None => &self.name[..generic_start],
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A live dependency value handed to an instance-bound check.
#[derive(Clone)]
pub struct Instance {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            type_name: type_name::<T>(),
            value,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Result<&T> {
        self.value
            .downcast_ref::<T>()
            .ok_or(GateError::InstanceMismatch {
                expected: type_name::<T>(),
                found: self.type_name,
            })
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Supplies the live instance behind a dependency token.
pub trait Lookup: Send + Sync {
    fn lookup(&self, token: &Token) -> Result<Instance>;
}

impl<F> Lookup for F
where
    F: Fn(&Token) -> Result<Instance> + Send + Sync,
{
    fn lookup(&self, token: &Token) -> Result<Instance> {
        self(token)
    }
}

/// In-memory `Lookup` keyed by type.
#[derive(Debug, Clone, Default)]
pub struct InstanceRegistry {
    instances: HashMap<TypeId, Instance>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under its own type, returning whatever was registered there before.
    pub fn register<T: Any + Send + Sync>(&mut self, value: T) -> Option<Instance> {
        self.register_arc(Arc::new(value))
    }

    pub fn register_arc<T: Any + Send + Sync>(&mut self, value: Arc<T>) -> Option<Instance> {
        let token = Token::of::<T>();
        debug!("Registering instance for {}", token);
        self.instances.insert(token.id(), Instance::from_arc(value))
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.instances.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Lookup for InstanceRegistry {
    fn lookup(&self, token: &Token) -> Result<Instance> {
        self.instances
            .get(&token.id())
            .cloned()
            .ok_or_else(|| GateError::InstanceNotFound(format!("no instance registered for {token}")))
    }
}
