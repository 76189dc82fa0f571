//! Bounded polling primitive for observing asynchronously-rendered state.
//!
//! Some pages only expose their data after a deferred render or a triggered
//! interaction. [`await_condition`] re-evaluates a predicate on a fixed
//! interval until it becomes true (then produces the supplied value exactly
//! once) or the attempt budget is exhausted (then fails with a timeout).
//! This is the only scheduling primitive in the pipeline: a cooperative
//! poll, no background watcher survives the call.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Fixed interval between predicate evaluations.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The condition never became true within the attempt budget.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("condition not met after {attempts} polls ({timeout:?})")]
    Timeout { attempts: u32, timeout: Duration },
}

/// Polls `predicate` every [`POLL_INTERVAL`] for up to `timeout / 500ms`
/// attempts; on the first true evaluation, runs `supply` once and returns
/// its value. Exhausting the budget fails with [`ReadinessError::Timeout`]
/// and performs no further polling.
///
/// Callers that trigger a state change first must write the predicate
/// against the settled state, not the transient one right after the
/// trigger; the first evaluation only happens after one full interval.
///
/// # Errors
///
/// Returns [`ReadinessError::Timeout`] when the predicate never became true.
pub async fn await_condition<P, PFut, S, SFut, T>(
    mut predicate: P,
    supply: S,
    timeout: Duration,
) -> Result<T, ReadinessError>
where
    P: FnMut() -> PFut + Send,
    PFut: Future<Output = bool> + Send,
    S: FnOnce() -> SFut + Send,
    SFut: Future<Output = T> + Send,
{
    #[allow(clippy::cast_possible_truncation)]
    let attempts = (timeout.as_millis() / POLL_INTERVAL.as_millis()).max(1) as u32;

    for remaining in (0..attempts).rev() {
        tokio::time::sleep(POLL_INTERVAL).await;
        if predicate().await {
            debug!(remaining, "condition met");
            return Ok(supply().await);
        }
        debug!(remaining, "condition not met yet");
    }

    Err(ReadinessError::Timeout {
        attempts,
        timeout,
    })
}
