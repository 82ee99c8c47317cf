// depgate-core/src/join.rs
use depgate_common::dependency::WaitCondition;
use depgate_common::error::{GateError, Result};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tracing::{debug, warn};

/// A wait-condition collected during classification, with where it came from.
pub(crate) struct PendingDependency {
    pub index: usize,
    pub label: String,
    pub condition: WaitCondition,
}

/// Polls every pending wait-condition on the current task until all succeed or one fails.
///
/// Returning (or being dropped) drops whatever is still in flight, which releases it.
pub(crate) async fn join_all_or_fail(pending: Vec<PendingDependency>) -> Result<()> {
    let mut outstanding = pending.len();
    debug!("Waiting on {} async dependencies.", outstanding);

    let mut in_flight: FuturesUnordered<_> = pending
        .into_iter()
        .map(|dependency| {
            let PendingDependency {
                index,
                label,
                condition,
            } = dependency;
            condition.map(move |settlement| (index, label, settlement))
        })
        .collect();

    while let Some((index, label, settlement)) = in_flight.next().await {
        match settlement.into_result() {
            Ok(()) => {
                outstanding -= 1;
                debug!(
                    "[{}] Async dependency '{}' settled; {} outstanding.",
                    index, label, outstanding
                );
            }
            Err(cause) => {
                warn!(
                    "[{}] Async dependency '{}' failed: {}. Releasing {} others.",
                    index,
                    label,
                    cause,
                    in_flight.len()
                );
                return Err(GateError::AsyncDependencyFailed(cause));
            }
        }
    }

    debug_assert_eq!(outstanding, 0);
    Ok(())
}
