//! # Breadth-first close propagation.
//!
//! Drives a process from Closing to Closed and pushes the close down its subtree.
//!
//! ## Flow
//! ```text
//! close() ──► begin_closing()            (CAS Running→Closing, fire closing, drop idle request)
//!        └──► spawn teardown():
//!               ├─► await on_start
//!               ├─► on_closing
//!               ├─► snapshot children     (same lock as start_child)
//!               ├─► begin_closing() on every child      ┐ siblings signaled before
//!               ├─► spawn teardown() for each of them   ┘ their own children
//!               ├─► await every child's done
//!               ├─► await work body
//!               ├─► on_closed
//!               └─► CAS Closing→Closed, detach from parent, fire done
//! ```
//!
//! ## Rules
//! - `closing` fires top-down: a child is only signaled by its parent's teardown.
//! - `done` fires bottom-up: a parent waits for every snapshotted child.
//! - Children already closing on their own are awaited, not signaled again.
//! - Breadth-first order holds per parent, not across the tree: a sibling with a
//!   slow `on_closing` signals its children after a faster sibling's children.

use futures::future::join_all;
use tokio::time;
use tracing::{Instrument, debug, trace, warn};

use super::node::Process;
use super::state::State;

impl Process {
    /// Running → Closing. Returns false if another caller got there first.
    pub(super) fn begin_closing(&self) -> bool {
        if !self.inner.state.transition(State::Running, State::Closing) {
            return false;
        }
        self.inner.idle.cancel();
        self.inner.closing.fire();
        debug!(parent: &self.inner.span, "Process closing.");
        true
    }

    pub(super) fn spawn_teardown(&self) {
        let me = self.clone();
        self.inner
            .runtime
            .spawn(me.teardown().instrument(self.inner.span.clone()));
    }

    async fn teardown(self) {
        let Some(after) = self.inner.config.stall_warning_after() else {
            self.close_subtree().await;
            return;
        };

        let close = self.close_subtree();
        tokio::pin!(close);
        if time::timeout(after, &mut close).await.is_err() {
            let open: Vec<i64> = self.children(Vec::new()).iter().map(Process::id).collect();
            warn!(
                stalled_for = ?after,
                open_children = ?open,
                work_body_done = self.inner.run_done.is_fired(),
                "Process is taking long to close."
            );
            close.await;
        }
    }

    async fn close_subtree(&self) {
        // on_closing never overlaps on_start
        self.inner.started.wait().await;

        let hooks = self.inner.spec.hooks().cloned();
        if let Some(hooks) = &hooks {
            hooks.on_closing(self).await;
        }

        let children = self.children(Vec::new());
        let signaled: Vec<&Process> = children.iter().filter(|c| c.begin_closing()).collect();
        trace!(
            children = children.len(),
            signaled = signaled.len(),
            "Closing children."
        );
        for child in signaled {
            child.spawn_teardown();
        }
        join_all(children.into_iter().map(|c| c.done().wait())).await;

        self.inner.run_done.wait().await;

        if let Some(hooks) = &hooks {
            hooks.on_closed(self).await;
        }
        self.finish_close();
    }

    fn finish_close(&self) {
        let closed = self.inner.state.transition(State::Closing, State::Closed);
        debug_assert!(closed, "teardown runs once per process");

        if let Some(parent) = self.parent() {
            parent.detach(self.id());
        }
        self.inner.done.fire();
        debug!("Process closed.");
    }
}
