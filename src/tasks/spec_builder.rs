use std::any::Any;
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::process::Process;
use crate::tasks::hooks::{Hooks, HooksRef};
use crate::tasks::run_fn::{RunFn, RunRef};
use crate::tasks::spec::{TaskRef, TaskSpec};

/// Builder for TaskSpec with fluent API
#[derive(Clone)]
pub struct TaskSpecBuilder {
    spec: TaskSpec,
}

impl TaskSpecBuilder {
    /// Creates a new builder with the given label
    pub fn new(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            spec: TaskSpec::new(label),
        }
    }

    /// Closes the process this long after it becomes idle.
    pub fn with_idle_close(mut self, delay: Duration) -> Self {
        self.spec.idle_close = delay;
        self
    }

    /// Attaches an opaque value, readable through [`Process::task_ref`].
    pub fn with_task_ref<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.spec.task_ref = Some(Arc::new(value) as TaskRef);
        self
    }

    pub fn with_hooks<H: Hooks>(mut self, hooks: H) -> Self {
        self.spec.hooks = Some(Arc::new(hooks) as HooksRef);
        self
    }

    pub fn with_hooks_ref(mut self, hooks: HooksRef) -> Self {
        self.spec.hooks = Some(hooks);
        self
    }

    /// Sets the work body from a closure
    pub fn with_run<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Process) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spec.run = Some(RunFn::arc(f));
        self
    }

    pub fn with_run_ref(mut self, run: RunRef) -> Self {
        self.spec.run = Some(run);
        self
    }

    pub fn build(self) -> TaskSpec {
        self.spec
    }
}

impl TaskSpec {
    /// Creates a builder for constructing TaskSpec with fluent API
    pub fn builder(label: impl Into<Cow<'static, str>>) -> TaskSpecBuilder {
        TaskSpecBuilder::new(label)
    }
}
