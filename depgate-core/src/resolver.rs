// depgate-core/src/resolver.rs
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use depgate_common::dependency::{Dependency, Outcome};
use depgate_common::error::{GateError, Result};
use depgate_common::registry::{InstanceRegistry, Lookup};
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, instrument, warn};

use crate::join::{join_all_or_fail, PendingDependency};

/// Gates a store or action on its declared dependencies.
#[derive(Clone)]
pub struct DependencyResolver {
    lookup: Arc<dyn Lookup>,
}

impl DependencyResolver {
    pub fn new(lookup: Arc<dyn Lookup>) -> Self {
        Self { lookup }
    }

    /// A resolver with nothing to look up. Store dependencies fail with `InstanceNotFound`.
    pub fn standalone() -> Self {
        Self::new(Arc::new(InstanceRegistry::new()))
    }

    /// Builds the resolution for `dependencies`. Nothing is evaluated until it is polled.
    pub fn resolve(&self, dependencies: Vec<Dependency>) -> Resolution {
        Resolution {
            inner: run(Arc::clone(&self.lookup), dependencies).boxed(),
        }
    }
}

impl std::fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver").finish_non_exhaustive()
    }
}

/// One resolution pass over a dependency list.
///
/// Resolves to `Ok(())` once every dependency is satisfied, or to the first failure.
/// Dropping it before then cancels the pass and releases every pending wait-condition.
#[must_use = "a resolution does nothing unless polled or subscribed"]
pub struct Resolution {
    inner: BoxFuture<'static, Result<()>>,
}

impl Future for Resolution {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

#[instrument(skip_all, fields(dependencies = dependencies.len()))]
async fn run(lookup: Arc<dyn Lookup>, dependencies: Vec<Dependency>) -> Result<()> {
    let pending = partition(lookup.as_ref(), dependencies)?;
    if pending.is_empty() {
        debug!("All dependencies satisfied synchronously.");
        return Ok(());
    }
    join_all_or_fail(pending).await?;
    debug!("All async dependencies satisfied.");
    Ok(())
}

/// Evaluates each dependency in order, stopping at the first synchronous failure.
/// Returns the wait-conditions still to be joined.
fn partition(lookup: &dyn Lookup, dependencies: Vec<Dependency>) -> Result<Vec<PendingDependency>> {
    let mut pending = Vec::new();

    for (index, dependency) in dependencies.into_iter().enumerate() {
        let label = dependency.label().to_string();
        debug!("[{}] Checking {} dependency '{}'", index, dependency.kind(), label);

        match dependency.evaluate(lookup)? {
            Outcome::Ready(true) => {
                debug!("[{}] '{}' satisfied.", index, label);
            }
            Outcome::Ready(false) => {
                warn!("[{}] '{}' is not satisfied.", index, label);
                return Err(GateError::DependencyUnsatisfied {
                    index,
                    dependency: label,
                });
            }
            Outcome::Pending(condition) => {
                debug!("[{}] '{}' is pending.", index, label);
                pending.push(PendingDependency {
                    index,
                    label,
                    condition,
                });
            }
            Outcome::Unrecognized(type_name) => {
                warn!("[{}] '{}' returned unsupported {}.", index, label, type_name);
                return Err(GateError::InvalidOutcomeType {
                    index,
                    dependency: label,
                    type_name,
                });
            }
        }
    }

    Ok(pending)
}
