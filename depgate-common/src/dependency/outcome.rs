// depgate-common/src/dependency/outcome.rs
use std::any::{type_name, Any};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::error::{Abandoned, Cause};

/// How a wait-condition ended.
#[derive(Debug, Clone)]
pub enum Settlement {
    /// Produced a value.
    Satisfied,
    /// Finished without producing a value.
    Completed,
    Failed(Cause),
}

impl Settlement {
    pub fn failed<E>(cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Settlement::Failed(Arc::new(cause))
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Settlement::Failed(_))
    }

    pub fn into_result(self) -> Result<(), Cause> {
        match self {
            Settlement::Satisfied | Settlement::Completed => Ok(()),
            Settlement::Failed(cause) => Err(cause),
        }
    }
}

type CancelHook = Box<dyn FnOnce() + Send>;

/// A dependency check whose verdict arrives later.
///
/// Nothing runs until the wait-condition is polled. Dropping it before it settles
/// releases it: the inner future is dropped and the cancel hook, if any, runs once.
pub struct WaitCondition {
    future: BoxFuture<'static, Settlement>,
    on_cancel: Option<CancelHook>,
    settled: bool,
}

impl WaitCondition {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Settlement> + Send + 'static,
    {
        Self {
            future: future.boxed(),
            on_cancel: None,
            settled: false,
        }
    }

    /// `Ok` settles as satisfied, `Err` as failed with the error as cause.
    pub fn from_result<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        Self::new(future.map(|result| match result {
            Ok(()) => Settlement::Satisfied,
            Err(e) => Settlement::failed(e),
        }))
    }

    /// A wait-condition settled from the outside through the returned `Settler`.
    pub fn channel() -> (Settler, Self) {
        let (tx, rx) = oneshot::channel();
        let condition = Self::new(async move {
            match rx.await {
                Ok(settlement) => settlement,
                Err(_) => Settlement::failed(Abandoned),
            }
        });
        (Settler { tx }, condition)
    }

    /// Runs `hook` if this wait-condition is released before it settles.
    pub fn on_cancel<H>(mut self, hook: H) -> Self
    where
        H: FnOnce() + Send + 'static,
    {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }
}

impl Future for WaitCondition {
    type Output = Settlement;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.future.poll_unpin(cx) {
            Poll::Ready(settlement) => {
                this.settled = true;
                this.on_cancel = None;
                Poll::Ready(settlement)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for WaitCondition {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(hook) = self.on_cancel.take() {
            hook();
        }
    }
}

impl fmt::Debug for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitCondition")
            .field("settled", &self.settled)
            .field("has_cancel_hook", &self.on_cancel.is_some())
            .finish_non_exhaustive()
    }
}

/// Producer side of `WaitCondition::channel`.
///
/// Every settling method consumes the settler and reports whether the verdict was
/// delivered; `false` means the wait-condition was already released and the verdict
/// is ignored.
#[derive(Debug)]
pub struct Settler {
    tx: oneshot::Sender<Settlement>,
}

impl Settler {
    pub fn succeed(self) -> bool {
        self.settle(Settlement::Satisfied)
    }

    pub fn complete(self) -> bool {
        self.settle(Settlement::Completed)
    }

    pub fn fail<E>(self, cause: E) -> bool
    where
        E: StdError + Send + Sync + 'static,
    {
        self.settle(Settlement::failed(cause))
    }

    pub fn settle(self, settlement: Settlement) -> bool {
        self.tx.send(settlement).is_ok()
    }

    pub fn is_released(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the wait-condition has been released.
    pub async fn released(&mut self) {
        self.tx.closed().await
    }
}

/// What a dependency check returned.
#[derive(Debug)]
pub enum Outcome {
    Ready(bool),
    Pending(WaitCondition),
    /// Neither a verdict nor a wait-condition; carries the offending type's name.
    Unrecognized(&'static str),
}

impl Outcome {
    /// Sorts an arbitrary value into an outcome.
    ///
    /// `bool`, `WaitCondition` and `Outcome` are recognised, also when boxed as
    /// `Box<dyn Any + Send>`. Anything else is `Unrecognized`.
    pub fn classify<T: Any + Send>(value: T) -> Self {
        let mut slot = Some(value);
        let any: &mut dyn Any = &mut slot;

        if let Some(verdict) = any.downcast_mut::<Option<bool>>().and_then(Option::take) {
            return Outcome::Ready(verdict);
        }
        if let Some(condition) = any
            .downcast_mut::<Option<WaitCondition>>()
            .and_then(Option::take)
        {
            return Outcome::Pending(condition);
        }
        if let Some(outcome) = any.downcast_mut::<Option<Outcome>>().and_then(Option::take) {
            return outcome;
        }
        if let Some(boxed) = any
            .downcast_mut::<Option<Box<dyn Any + Send>>>()
            .and_then(Option::take)
        {
            return Self::classify_boxed(boxed);
        }
        Outcome::Unrecognized(type_name::<T>())
    }

    fn classify_boxed(boxed: Box<dyn Any + Send>) -> Self {
        let boxed = match boxed.downcast::<bool>() {
            Ok(verdict) => return Outcome::Ready(*verdict),
            Err(other) => other,
        };
        let boxed = match boxed.downcast::<WaitCondition>() {
            Ok(condition) => return Outcome::Pending(*condition),
            Err(other) => other,
        };
        match boxed.downcast::<Outcome>() {
            Ok(outcome) => *outcome,
            Err(_) => Outcome::Unrecognized(type_name::<Box<dyn Any + Send>>()),
        }
    }
}

impl From<bool> for Outcome {
    fn from(verdict: bool) -> Self {
        Outcome::Ready(verdict)
    }
}

impl From<WaitCondition> for Outcome {
    fn from(condition: WaitCondition) -> Self {
        Outcome::Pending(condition)
    }
}
