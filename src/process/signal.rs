//! # One-shot broadcast signal.
//!
//! [`Signal`] moves from "not fired" to "fired" exactly once and can be awaited by
//! any number of tasks. It is a read-only view over a [`CancellationToken`]: holders
//! can wait and poll, only the owning process can fire it.
//!
//! ## Rules
//! - Firing is idempotent; later fires are no-ops.
//! - Waiting on an already fired signal completes immediately.
//! - A fired signal never un-fires.

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Read-only, many-reader, one-shot broadcast event.
///
/// Cheap to clone; every clone observes the same event.
#[derive(Clone, Debug)]
pub struct Signal {
    token: CancellationToken,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Fires the signal, waking every waiter.
    pub(crate) fn fire(&self) {
        self.token.cancel();
    }

    /// True once the signal has fired.
    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits until the signal fires.
    ///
    /// The returned future owns its own handle, so it can outlive `self`
    /// (handy in `select!` and when collecting many waits at once).
    pub fn wait(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }

    /// Returns a token cancelled when this signal fires.
    ///
    /// Cancelling the returned token does not fire the signal.
    pub(crate) fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}
