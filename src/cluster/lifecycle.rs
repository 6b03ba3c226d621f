//! Lifecycle state machine shared by every topology unit.
//!
//! Nodes, replica groups, and the cluster itself all carry the same
//! tri-state:
//!
//! ```text
//! not-started -> started -> stopped
//! ```
//!
//! Transitions are idempotent at the operation level: `start()` on a
//! unit that is already started (or stopped) is a no-op, and `stop()`
//! on a unit that never started is a silent skip. A stopped unit stays
//! stopped; there is no restart edge. The state is an atomic so
//! concurrent readers (status checks, logging) never need a lock, while
//! mutation remains single-writer by convention.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;

use crate::error::Result;

const NOT_STARTED: u8 = 0;
const STARTED: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle phase of a topology unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// The unit has never been started.
    #[default]
    NotStarted,
    /// The unit started successfully and has not been stopped.
    Started,
    /// The unit was stopped after starting (terminal).
    Stopped,
}

impl LifecycleState {
    /// Check if the unit has never been started.
    #[inline]
    pub fn is_not_started(&self) -> bool {
        matches!(self, LifecycleState::NotStarted)
    }

    /// Check if the unit is currently running.
    #[inline]
    pub fn is_started(&self) -> bool {
        matches!(self, LifecycleState::Started)
    }

    /// Check if the unit has been stopped.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        matches!(self, LifecycleState::Stopped)
    }

    /// Human-readable phase name for logs.
    pub fn state_name(&self) -> &'static str {
        match self {
            LifecycleState::NotStarted => "not-started",
            LifecycleState::Started => "started",
            LifecycleState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_name())
    }
}

/// Atomic cell holding a unit's lifecycle phase.
///
/// A failed start leaves the cell at not-started, so the operation can
/// be retried; the phase only advances on success.
#[derive(Debug, Default)]
pub struct LifecycleCell(AtomicU8);

impl LifecycleCell {
    /// Create a cell in the not-started phase.
    pub fn new() -> Self {
        Self(AtomicU8::new(NOT_STARTED))
    }

    /// Read the current phase.
    pub fn state(&self) -> LifecycleState {
        match self.0.load(Ordering::Acquire) {
            STARTED => LifecycleState::Started,
            STOPPED => LifecycleState::Stopped,
            _ => LifecycleState::NotStarted,
        }
    }

    /// Record a successful start.
    pub fn mark_started(&self) {
        self.0.store(STARTED, Ordering::Release);
    }

    /// Record a completed stop.
    pub fn mark_stopped(&self) {
        self.0.store(STOPPED, Ordering::Release);
    }
}

/// A unit the dependency graph can start and stop.
///
/// Implementations own their idempotence: `start` on an already-started
/// unit and `stop` on a never-started unit both return `Ok(())` without
/// touching the runtime.
#[async_trait]
pub trait Startable: Send + Sync {
    /// Stable unit name, used in the dependency relation and in logs.
    fn name(&self) -> &str;

    /// Current lifecycle phase.
    fn state(&self) -> LifecycleState;

    /// Bring the unit up. No-op if not in the not-started phase.
    async fn start(&self) -> Result<()>;

    /// Tear the unit down. No-op unless currently started.
    async fn stop(&self) -> Result<()>;
}
