//! The single polling primitive for membership convergence.
//!
//! Shard registration and shard removal both follow the same shape:
//! issue a command, then repeatedly probe the cluster's view until it
//! reflects the change or the budget runs out. This module holds that
//! shape once, built on the `backon` crate, so the two flows cannot
//! drift apart.
//!
//! Polling is synchronous from the caller's point of view: the awaiting
//! task sleeps between probes, no background task is spawned, and there
//! is no mid-poll cancellation hook. The caller waits for convergence
//! or for the budget to elapse.
//!
//! # Example
//!
//! ```rust,no_run
//! use shardonnay::cluster::convergence::{PollPolicy, await_converged};
//!
//! async fn example() -> shardonnay::error::Result<()> {
//!     let policy = PollPolicy::default();
//!     let converged = await_converged(&policy, || async {
//!         // probe the cluster's membership view
//!         Ok(true)
//!     })
//!     .await?;
//!     assert!(converged);
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};

use crate::constants::{DEFAULT_CONVERGENCE_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_SECS};
use crate::error::{Error, Result};

/// Fixed-interval polling budget for membership convergence.
///
/// The defaults (1-second interval, 30-second budget) match what the
/// cluster's own balancer needs for a single-member shard to register
/// or drain in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between consecutive probes.
    pub interval: Duration,
    /// Total time the caller is willing to wait for convergence.
    pub timeout: Duration,
}

impl PollPolicy {
    /// Create a policy from an interval and a total budget.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Number of re-probes after the initial one.
    ///
    /// Chosen so the total time slept is the budget: the first probe is
    /// immediate, every later one costs one interval.
    pub fn max_attempts(&self) -> usize {
        let interval_ms = self.interval.as_millis().max(1);
        ((self.timeout.as_millis() / interval_ms) as usize).max(1)
    }

    /// The backoff policy driving the poll loop: constant interval, no
    /// jitter (determinism matters more than herd avoidance here).
    pub fn backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.interval)
            .with_max_times(self.max_attempts())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_CONVERGENCE_TIMEOUT_SECS),
        }
    }
}

/// Outcome classification for a single probe inside the retry loop.
enum ProbeError {
    /// The view has not converged yet; keep polling.
    Pending,
    /// The probe itself failed; stop polling and surface the error.
    Fatal(Error),
}

/// Drive `probe` at the policy's fixed interval until it reports
/// convergence or the budget elapses.
///
/// Returns `Ok(true)` on convergence, `Ok(false)` when the budget ran
/// out with the view still unconverged (the caller attaches domain
/// context, typically [`Error::MembershipTimeout`]), and `Err` as soon
/// as a probe fails for a reason other than "not yet".
pub async fn await_converged<F, Fut>(policy: &PollPolicy, mut probe: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let outcome = (move || {
        let attempt = probe();
        async move {
            match attempt.await {
                Ok(true) => Ok(()),
                Ok(false) => Err(ProbeError::Pending),
                Err(e) => Err(ProbeError::Fatal(e)),
            }
        }
    })
    .retry(policy.backoff())
    .when(|e| matches!(e, ProbeError::Pending))
    .await;

    match outcome {
        Ok(()) => Ok(true),
        Err(ProbeError::Pending) => Ok(false),
        Err(ProbeError::Fatal(e)) => Err(e),
    }
}
