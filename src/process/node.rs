//! # Process: one node of the tree.
//!
//! A [`Process`] is a cheap, clonable handle to shared node state. The parent owns
//! its children (strong handles in `children`); a child only keeps a [`Weak`] link
//! back, used to detach itself once closed.
//!
//! ## Start
//! ```text
//! parent.start_child(spec)
//!   ├─► lock parent.children
//!   │     ├─ parent not Running ─► Err(ParentClosed)
//!   │     └─ insert child
//!   ├─► on_start(child)          (caller blocked; a concurrent teardown waits for it)
//!   │     └─ Err ─► close(child), await done ─► Err(Start)
//!   ├─► spawn work body          (if any)   ──► on return: arm idle close if
//!   │                                            idle_close set, else close()
//!   └─► arm idle close           (if no body and idle_close set)
//! ```
//!
//! ## Rules
//! - The parent-state check and the insertion happen under the same lock the
//!   teardown uses for its snapshot: a child is either snapshotted or rejected.
//! - A work body is not started on a process that began closing during `on_start`.
//! - Every task of a tree is spawned on the runtime the root was started on, so
//!   `close()` and `close_when_idle()` may be called from any thread.
//! - A process is removed from its parent's children right before its done signal fires.

use std::any::Any;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, debug_span, error, trace, warn};

use super::id::next_id;
use super::idle::IdleSlot;
use super::signal::Signal;
use super::state::{State, StateCell};
use crate::config::Config;
use crate::error::ProcessError;
use crate::tasks::{RunRef, TaskRef, TaskSpec};

/// Shared state of one process.
pub(super) struct Inner {
    pub(super) id: i64,
    pub(super) spec: TaskSpec,
    pub(super) config: Arc<Config>,
    /// Runtime every task of this tree is spawned on; captured by the root.
    pub(super) runtime: Handle,
    pub(super) parent: Weak<Inner>,
    pub(super) state: StateCell,
    pub(super) children: Mutex<BTreeMap<i64, Process>>,
    pub(super) closing: Signal,
    pub(super) done: Signal,
    /// Fired once `on_start` returned (or right away without hooks).
    pub(super) started: Signal,
    /// Fired when the work body returned, or at start when there is none.
    pub(super) run_done: Signal,
    pub(super) idle: IdleSlot,
    pub(super) span: Span,
}

/// Handle to a node of a process tree.
///
/// Clones refer to the same node. See the [crate docs](crate) for the lifecycle.
#[derive(Clone)]
pub struct Process {
    pub(super) inner: Arc<Inner>,
}

impl Process {
    /// Starts a new root process with the default [`Config`].
    pub async fn start(spec: TaskSpec) -> Result<Process, ProcessError> {
        Self::start_with_config(Config::default(), spec).await
    }

    /// Starts a new root process; every descendant shares `config`.
    pub async fn start_with_config(
        config: Config,
        spec: TaskSpec,
    ) -> Result<Process, ProcessError> {
        let root = Process::new_node(None, Arc::new(config), Handle::current(), spec);
        root.launch().await
    }

    /// Creates a child of this process and starts it.
    ///
    /// Blocks for the duration of `on_start` only; never for the work body.
    ///
    /// ### Errors
    /// - [`ProcessError::ParentClosed`] if this process is closing or closed
    /// - [`ProcessError::Start`] if `on_start` failed; the child is already fully
    ///   closed and detached when this is returned
    pub async fn start_child(&self, spec: TaskSpec) -> Result<Process, ProcessError> {
        let child = Process::new_node(
            Some(self),
            Arc::clone(&self.inner.config),
            self.inner.runtime.clone(),
            spec,
        );
        {
            let mut children = self.inner.children.lock();
            if self.inner.state.load() != State::Running {
                debug!(parent: &self.inner.span, child = child.label(), "Rejected child of closing process.");
                return Err(ProcessError::ParentClosed {
                    parent: self.id(),
                    label: child.label().to_string(),
                });
            }
            children.insert(child.id(), child.clone());
        }
        child.launch().await
    }

    /// Starts a child that runs `f` and closes once `f` returned and every child
    /// it started is gone.
    ///
    /// Shorthand for a [`TaskSpec`] with the work body `f` and a 1ns idle-close delay.
    pub async fn go<F, Fut>(
        &self,
        label: impl Into<Cow<'static, str>>,
        f: F,
    ) -> Result<Process, ProcessError>
    where
        F: Fn(Process) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let spec = TaskSpec::builder(label)
            .with_idle_close(Duration::from_nanos(1))
            .with_run(f)
            .build();
        self.start_child(spec).await
    }

    /// Initiates shutdown of this process and its whole subtree.
    ///
    /// Non-blocking: await [`done`](Self::done) to observe completion. Calls after
    /// the first are no-ops. Always returns `Ok(())`.
    pub fn close(&self) -> Result<(), ProcessError> {
        if self.begin_closing() {
            self.spawn_teardown();
        }
        Ok(())
    }

    /// Appends the currently open children to `into` (ordered by id) and returns it.
    ///
    /// The snapshot is backward-looking: any child may close right after.
    pub fn children(&self, mut into: Vec<Process>) -> Vec<Process> {
        let children = self.inner.children.lock();
        into.extend(children.values().cloned());
        into
    }

    /// Signal fired when `close()` is first accepted.
    pub fn closing(&self) -> Signal {
        self.inner.closing.clone()
    }

    /// Signal fired once the process and its whole subtree are closed.
    pub fn done(&self) -> Signal {
        self.inner.done.clone()
    }

    /// Process-wide unique id.
    pub fn id(&self) -> i64 {
        self.inner.id
    }

    /// Caller-supplied label.
    pub fn label(&self) -> &str {
        self.inner.spec.label()
    }

    /// Opaque value given in the [`TaskSpec`].
    pub fn task_ref(&self) -> Option<&TaskRef> {
        self.inner.spec.task_ref()
    }

    /// Typed access to [`task_ref`](Self::task_ref).
    pub fn task_ref_as<T: Any>(&self) -> Option<&T> {
        self.task_ref()?.downcast_ref::<T>()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.inner.state.load()
    }

    /// True once `close()` was accepted.
    pub fn is_closing(&self) -> bool {
        self.inner.closing.is_fired()
    }

    /// True once the done signal fired.
    pub fn is_done(&self) -> bool {
        self.inner.done.is_fired()
    }

    /// The creating process, if it is still alive.
    pub fn parent(&self) -> Option<Process> {
        self.inner.parent.upgrade().map(|inner| Process { inner })
    }

    /// Returns a token cancelled when this process starts closing.
    ///
    /// Use it to hand the process lifetime to `CancellationToken`-based APIs.
    /// Cancelling the returned token does not close the process.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.closing.child_token()
    }

    /// Settings shared by the whole tree, as given to the root.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Span carrying `process.id` and `process.label`, parented on the creator's span.
    ///
    /// Work bodies already run inside it; use it to instrument other futures.
    pub fn span(&self) -> &Span {
        &self.inner.span
    }

    fn new_node(
        parent: Option<&Process>,
        config: Arc<Config>,
        runtime: Handle,
        spec: TaskSpec,
    ) -> Process {
        let id = next_id();
        let span = match parent {
            Some(p) => debug_span!(parent: &p.inner.span, "process", process.id = id, process.label = %spec.label()),
            None => debug_span!("process", process.id = id, process.label = %spec.label()),
        };
        Process {
            inner: Arc::new(Inner {
                id,
                spec,
                config,
                runtime,
                parent: parent.map_or_else(Weak::new, |p| Arc::downgrade(&p.inner)),
                state: StateCell::new(),
                children: Mutex::new(BTreeMap::new()),
                closing: Signal::new(),
                done: Signal::new(),
                started: Signal::new(),
                run_done: Signal::new(),
                idle: IdleSlot::new(),
                span,
            }),
        }
    }

    /// Runs `on_start`, then the work body or the idle policy.
    async fn launch(self) -> Result<Process, ProcessError> {
        trace!(parent: &self.inner.span, "Process starting.");

        let started = match self.inner.spec.hooks().cloned() {
            Some(hooks) => {
                hooks
                    .on_start(&self)
                    .instrument(self.inner.span.clone())
                    .await
            }
            None => Ok(()),
        };
        self.inner.started.fire();

        if let Err(source) = started {
            warn!(parent: &self.inner.span, error = %source, "Process failed to start, closing.");
            self.inner.run_done.fire();
            self.close()?;
            self.inner.done.wait().await;
            return Err(ProcessError::Start {
                label: self.label().to_string(),
                source,
            });
        }

        match self.inner.spec.run().cloned() {
            Some(run) if self.state() == State::Running => self.spawn_run(run),
            Some(_) => {
                debug!(parent: &self.inner.span, "Process closed while starting, skipping work body.");
                self.inner.run_done.fire();
            }
            None => {
                self.inner.run_done.fire();
                self.arm_idle_close();
            }
        }

        trace!(parent: &self.inner.span, "Process started.");
        Ok(self)
    }

    fn spawn_run(&self, run: RunRef) {
        let ctx = self.clone();
        let body = run.spawn(self.clone());
        self.inner.runtime.spawn(
            async move {
                if let Err(panic) = AssertUnwindSafe(body).catch_unwind().await {
                    error!("Process work body panicked: {}", panic_message(panic.as_ref()));
                }
                trace!("Process work body returned.");
                ctx.inner.run_done.fire();
                // with an idle delay, live children keep the process open
                if ctx.inner.spec.idle_close().is_some() {
                    ctx.arm_idle_close();
                } else {
                    let _ = ctx.close();
                }
            }
            .instrument(self.inner.span.clone()),
        );
    }

    /// No children and the work body (if any) has returned.
    pub(super) fn is_idle(&self) -> bool {
        self.inner.run_done.is_fired() && self.inner.children.lock().is_empty()
    }

    /// Arms the idle scheduler with the `TaskSpec` idle delay if the process is idle now.
    pub(super) fn arm_idle_close(&self) {
        if let Some(delay) = self.inner.spec.idle_close() {
            if self.state() == State::Running && self.is_idle() {
                self.close_when_idle(delay);
            }
        }
    }

    /// Removes a closed child and re-evaluates the idle policy.
    pub(super) fn detach(&self, child_id: i64) {
        let removed = self.inner.children.lock().remove(&child_id).is_some();
        if removed {
            trace!(parent: &self.inner.span, child_id, "Child detached.");
            self.arm_idle_close();
        }
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("state", &self.state())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
