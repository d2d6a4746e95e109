//! # Lifecycle state of a process.
//!
//! ```text
//! Running ──close()──► Closing ──children done, on_closed──► Closed
//! ```
//!
//! Transitions are monotonic and performed with compare-and-set, so concurrent
//! `close()` calls collapse into exactly one Running → Closing transition.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a process.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    /// Default state after creation.
    Running = 0,
    /// `close()` was accepted; teardown is in progress.
    Closing = 1,
    /// Teardown finished; the done signal has fired or is about to.
    Closed = 2,
}

impl State {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            State::Running => "running",
            State::Closing => "closing",
            State::Closed => "closed",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => State::Running,
            1 => State::Closing,
            _ => State::Closed,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Atomic cell holding a [`State`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(State::Running as u8))
    }

    #[inline]
    pub(crate) fn load(&self) -> State {
        State::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves `from` → `to`; returns false if the cell was not in `from`.
    #[inline]
    pub(crate) fn transition(&self, from: State, to: State) -> bool {
        debug_assert!(to > from, "state transitions are monotonic");
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
