//! # Lifecycle hooks.
//!
//! [`Hooks`] is the fixed interface a task implements to take part in its process
//! lifecycle. Every hook has a no-op default, so implementors override only what
//! they need.
//!
//! ## Order
//! ```text
//! start_child() ──► on_start ──► (work body runs)
//!
//! close() ──► on_closing ──► children closed & awaited ──► work body awaited ──► on_closed ──► done
//! ```
//!
//! `on_closing` and `on_closed` each run exactly once per process, however many
//! times `close()` is called.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::process::Process;

/// # Lifecycle callbacks of one process.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use proctree::{Hooks, Process, TaskError};
///
/// struct Listener;
///
/// #[async_trait]
/// impl Hooks for Listener {
///     async fn on_start(&self, ctx: &Process) -> Result<(), TaskError> {
///         if ctx.is_closing() {
///             return Err(TaskError::Canceled);
///         }
///         // bind sockets...
///         Ok(())
///     }
///
///     async fn on_closed(&self, _ctx: &Process) {
///         // release sockets...
///     }
/// }
/// ```
#[async_trait]
pub trait Hooks: Send + Sync + 'static {
    /// Runs inside `start_child`, blocking the caller until it returns.
    ///
    /// On error the process is closed (including `on_closing`/`on_closed`) before
    /// the error reaches the caller, and the work body never runs.
    async fn on_start(&self, _ctx: &Process) -> Result<(), TaskError> {
        Ok(())
    }

    /// Runs once `close()` is first accepted, before children are signaled.
    async fn on_closing(&self, _ctx: &Process) {}

    /// Runs after every child is closed and the work body finished, right before
    /// the done signal fires.
    async fn on_closed(&self, _ctx: &Process) {}
}

/// Shared handle to a hooks implementation.
pub type HooksRef = Arc<dyn Hooks>;
