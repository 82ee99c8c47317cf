// depgate-core/src/handle.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use depgate_common::error::GateError;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error};

use crate::resolver::Resolution;

impl Resolution {
    /// Runs the resolution in the background on the current tokio runtime.
    ///
    /// Exactly one of the callbacks is invoked when the resolution settles, unless
    /// it is cancelled first through the returned handle.
    pub fn subscribe<S, E>(self, on_success: S, on_error: E) -> ResolutionHandle
    where
        S: FnOnce() + Send + 'static,
        E: FnOnce(GateError) + Send + 'static,
    {
        let terminated = Arc::new(AtomicBool::new(false));
        let terminated_in_task = Arc::clone(&terminated);

        let task = tokio::spawn(async move {
            let result = self.await;
            if terminated_in_task.swap(true, Ordering::SeqCst) {
                debug!("Resolution settled after cancellation; dropping result.");
                return;
            }
            match result {
                Ok(()) => on_success(),
                Err(e) => on_error(e),
            }
        });

        ResolutionHandle { task, terminated }
    }
}

/// Control over a subscribed resolution. Dropping the handle detaches it.
#[derive(Debug)]
pub struct ResolutionHandle {
    task: JoinHandle<()>,
    terminated: Arc<AtomicBool>,
}

impl ResolutionHandle {
    /// Cancels the resolution. Every pending wait-condition has been released by the
    /// time this returns, and no callback fires afterwards. No-op once a callback fired.
    pub async fn cancel(self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            debug!("Resolution already terminal; cancel is a no-op.");
            log_join_error(self.task.await);
            return;
        }
        self.task.abort();
        match self.task.await {
            Err(e) if e.is_cancelled() => debug!("Resolution cancelled."),
            other => log_join_error(other),
        }
    }

    /// Whether a callback has fired or the resolution was cancelled.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Waits for the background task, including the callback it invokes.
    pub async fn wait(self) {
        log_join_error(self.task.await);
    }
}

fn log_join_error(result: Result<(), JoinError>) {
    if let Err(join_error) = result {
        if join_error.is_panic() {
            let payload = join_error.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!("Resolution task panicked: {}", message);
        } else {
            debug!("Resolution task ended early: {}", join_error);
        }
    }
}
