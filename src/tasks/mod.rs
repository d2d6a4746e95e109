//! # Task descriptors.
//!
//! This module provides the caller-supplied description of a process:
//! - [`TaskSpec`] - immutable descriptor (label, reference, idle policy, hooks, body)
//! - [`TaskSpecBuilder`] - fluent construction of a [`TaskSpec`]
//! - [`Hooks`] - lifecycle callbacks with no-op defaults
//! - [`Run`] / [`RunFn`] - the asynchronous work body

mod hooks;
mod run_fn;
mod spec;
mod spec_builder;

pub use hooks::{Hooks, HooksRef};
pub use run_fn::{BoxRunFuture, Run, RunFn, RunRef};
pub use spec::{TaskRef, TaskSpec};
pub use spec_builder::TaskSpecBuilder;
