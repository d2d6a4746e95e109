//! # Function-backed work body (`RunFn`)
//!
//! [`RunFn`] wraps a closure `F: Fn(Process) -> Fut`, producing a fresh future each
//! time a process built from the `TaskSpec` starts. No state is shared between those
//! futures; capture an `Arc<...>` explicitly if they need to share.
//!
//! ## Example
//! ```rust
//! use proctree::{Process, RunFn, RunRef};
//!
//! let body: RunRef = RunFn::arc(|ctx: Process| async move {
//!     ctx.closing().wait().await;
//! });
//! # let _ = body;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::process::Process;

/// Boxed future returned by [`Run::spawn`].
pub type BoxRunFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// # Asynchronous work body of a process.
///
/// The returned future runs on the tokio runtime, concurrently with the rest of
/// the tree. When it completes the process closes itself.
pub trait Run: Send + Sync + 'static {
    /// Creates the work future for the given process.
    fn spawn(&self, ctx: Process) -> BoxRunFuture;
}

/// Shared handle to a work body.
pub type RunRef = Arc<dyn Run>;

/// Function-backed work body.
pub struct RunFn<F> {
    f: F,
}

impl<F> RunFn<F> {
    /// Creates a new function-backed work body.
    ///
    /// Prefer [`RunFn::arc`] when you immediately need a [`RunRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the work body and returns it as a shared handle.
    pub fn arc<Fut>(f: F) -> RunRef
    where
        F: Fn(Process) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }
}

impl<F, Fut> Run for RunFn<F>
where
    F: Fn(Process) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn spawn(&self, ctx: Process) -> BoxRunFuture {
        Box::pin((self.f)(ctx))
    }
}
