//! # Idle-close scheduler.
//!
//! Closes a process some time after it becomes idle: no children left and its work
//! body (if any) returned.
//!
//! ## Architecture
//! ```text
//! close_when_idle(d)
//!   ├─ no pending request ─► watch::channel(now + d) ─► spawn idle_timer(rx)
//!   └─ pending request    ─► tx.send_replace(now + d)   (timer restarts its sleep)
//!
//! idle_timer:
//!   loop {
//!     select! {
//!       sleep_until(deadline) ─► lock slot; deadline moved? continue : clear slot, stop
//!       rx.changed()          ─► re-read deadline
//!       sender dropped        ─► cancelled by close()
//!       closing signal        ─► cancelled
//!     }
//!   }
//!   idle? ─► close() : drop request (no re-arm)
//! ```
//!
//! ## Rules
//! - At most one timer per process.
//! - A new request replaces the pending deadline; elapsed time is not kept.
//! - `close()` drops the pending request.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{Instrument, trace};

use super::node::Process;
use super::state::State;

/// Slot holding the pending idle request of one process.
#[derive(Debug)]
pub(super) struct IdleSlot {
    pending: Mutex<Option<watch::Sender<Instant>>>,
}

impl IdleSlot {
    pub(super) fn new() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }

    /// Drops the pending request, if any; its timer exits without closing.
    pub(super) fn cancel(&self) {
        self.pending.lock().take();
    }

    #[cfg(test)]
    pub(super) fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}

enum Wake {
    Elapsed(Instant),
    Rearmed,
    Cancelled,
}

impl Process {
    /// Requests a `close()` once this process is idle, after `delay`.
    ///
    /// - With no pending request, arms a timer for `delay`.
    /// - With a pending request, restarts it with the new `delay`.
    /// - When the timer elapses and the process is idle (no children, work body
    ///   returned), closes it; otherwise the request is dropped.
    ///
    /// Ignored once the process is closing. Callable from any thread.
    pub fn close_when_idle(&self, delay: Duration) {
        if self.state() != State::Running {
            return;
        }
        let deadline = Instant::now() + delay;

        let mut pending = self.inner.idle.pending.lock();
        if let Some(tx) = pending.as_ref() {
            tx.send_replace(deadline);
            trace!(parent: &self.inner.span, ?delay, "Idle close re-armed.");
            return;
        }
        let (tx, rx) = watch::channel(deadline);
        *pending = Some(tx);
        drop(pending);

        trace!(parent: &self.inner.span, ?delay, "Idle close armed.");
        let me = self.clone();
        self.inner
            .runtime
            .spawn(me.idle_timer(rx).instrument(self.inner.span.clone()));
    }

    async fn idle_timer(self, mut rx: watch::Receiver<Instant>) {
        loop {
            let deadline = *rx.borrow_and_update();
            let wake = tokio::select! {
                _ = time::sleep_until(deadline) => Wake::Elapsed(deadline),
                changed = rx.changed() => match changed {
                    Ok(()) => Wake::Rearmed,
                    Err(_) => Wake::Cancelled,
                },
                _ = self.inner.closing.wait() => Wake::Cancelled,
            };

            match wake {
                Wake::Rearmed => continue,
                Wake::Cancelled => return,
                Wake::Elapsed(deadline) => {
                    let mut pending = self.inner.idle.pending.lock();
                    let rearmed = match pending.as_ref() {
                        None => return,
                        Some(tx) => *tx.borrow() != deadline,
                    };
                    // re-armed between wake-up and lock
                    if rearmed {
                        continue;
                    }
                    pending.take();
                    break;
                }
            }
        }

        if self.is_idle() {
            trace!("Process idle, closing.");
            let _ = self.close();
        } else {
            trace!("Process busy when idle timer elapsed, request dropped.");
        }
    }
}
