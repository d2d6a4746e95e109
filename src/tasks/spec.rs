//! # Task specification for a process.
//!
//! Defines [`TaskSpec`], the immutable descriptor handed to
//! [`Process::start_child`](crate::Process::start_child): label, opaque reference,
//! idle policy, optional hooks and optional work body.
//!
//! A spec can be created:
//! - **Bare** with [`TaskSpec::new`] (label only; a passive container process)
//! - **Fluently** with [`TaskSpec::builder`]
//!
//! ## Rules
//! - Presence of a work body changes behavior: the process closes itself when the
//!   body returns, and is only idle once the body returned.
//! - `idle_close = 0s` is treated as "no idle policy".

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::tasks::hooks::HooksRef;
use crate::tasks::run_fn::RunRef;

/// Opaque caller value attached to a process; never interpreted by the tree.
pub type TaskRef = Arc<dyn Any + Send + Sync>;

/// Descriptor of one process.
///
/// Bundles together:
/// - Label (diagnostics only)
/// - Opaque reference ([`TaskRef`])
/// - Idle-close delay
/// - Lifecycle hooks ([`HooksRef`])
/// - Work body ([`RunRef`])
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use proctree::{Process, TaskSpec};
///
/// let spec = TaskSpec::builder("conn")
///     .with_idle_close(Duration::from_secs(5))
///     .with_task_ref(42_u32)
///     .with_run(|ctx: Process| async move {
///         ctx.closing().wait().await;
///     })
///     .build();
///
/// assert_eq!(spec.label(), "conn");
/// assert_eq!(spec.idle_close(), Some(Duration::from_secs(5)));
/// assert!(spec.has_run());
/// ```
#[derive(Clone)]
pub struct TaskSpec {
    pub(super) label: Cow<'static, str>,
    pub(super) idle_close: Duration,
    pub(super) task_ref: Option<TaskRef>,
    pub(super) hooks: Option<HooksRef>,
    pub(super) run: Option<RunRef>,
}

impl TaskSpec {
    /// Creates a spec with only a label: no hooks, no work body, no idle policy.
    pub fn new(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            idle_close: Duration::ZERO,
            task_ref: None,
            hooks: None,
            run: None,
        }
    }

    /// Returns the label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the idle-close delay, if one is configured.
    ///
    /// - `None` → the process never closes on its own when idle
    /// - `Some(d)` → once idle, close after `d`
    #[inline]
    pub fn idle_close(&self) -> Option<Duration> {
        if self.idle_close == Duration::ZERO {
            None
        } else {
            Some(self.idle_close)
        }
    }

    /// Returns the opaque caller value.
    pub fn task_ref(&self) -> Option<&TaskRef> {
        self.task_ref.as_ref()
    }

    /// Returns the hooks, if any.
    pub fn hooks(&self) -> Option<&HooksRef> {
        self.hooks.as_ref()
    }

    /// Returns the work body, if any.
    pub fn run(&self) -> Option<&RunRef> {
        self.run.as_ref()
    }

    /// True if a work body is configured.
    pub fn has_run(&self) -> bool {
        self.run.is_some()
    }

    /// Returns a new spec with updated idle-close delay.
    pub fn with_idle_close(mut self, delay: Duration) -> Self {
        self.idle_close = delay;
        self
    }

    /// Returns a new spec with updated hooks.
    pub fn with_hooks(mut self, hooks: HooksRef) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Returns a new spec with updated work body.
    pub fn with_run_ref(mut self, run: RunRef) -> Self {
        self.run = Some(run);
        self
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("label", &self.label)
            .field("idle_close", &self.idle_close)
            .field("task_ref", &self.task_ref.is_some())
            .field("hooks", &self.hooks.is_some())
            .field("run", &self.run.is_some())
            .finish()
    }
}
