//! # proctree
//!
//! **proctree** is a hierarchical lifecycle primitive for tokio: a tree of
//! processes, each owning its children, each optionally running async work, each
//! supporting coordinated, cascading shutdown with completion signals.
//!
//! It extends the "cancellation context" idea with supervision semantics: child
//! tracking, breadth-first teardown, idle-triggered close and rollback of
//! processes that fail to start.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                         ┌──────────────────────┐
//!                         │   Process (root)     │
//!                         │  - children          │
//!                         │  - closing / done    │
//!                         │  - idle request      │
//!                         └───┬──────────────┬───┘
//!             start_child()   │              │   start_child()
//!                             ▼              ▼
//!                   ┌──────────────┐   ┌──────────────┐
//!                   │   Process    │   │   Process    │
//!                   │ (work body)  │   │  (hooks)     │
//!                   └──────┬───────┘   └──────────────┘
//!                          ▼
//!                   ┌──────────────┐
//!                   │   Process    │      parent ──owns──► child
//!                   └──────────────┘      child  ──weak──► parent
//! ```
//!
//! ### Lifecycle
//! ```text
//! start_child(spec) ──► on_start ──► work body (spawned) ──► returns ──► close()
//!                                                          (or idle close, if set)
//!
//! close():
//!   Running ──CAS──► Closing   (fires `closing`, drops idle request)
//!     ├─► on_closing
//!     ├─► signal all children  (siblings before their children)
//!     ├─► await children `done`
//!     ├─► await work body
//!     ├─► on_closed
//!     └─► Closed ──► detach from parent ──► fires `done`
//! ```
//!
//! ## Guarantees
//! - `closing` fires top-down; `done` fires bottom-up.
//! - `on_closing` / `on_closed` run exactly once, however many `close()` calls race.
//! - A child whose `on_start` fails is fully closed and detached before the error
//!   is returned; its work body never runs.
//! - No child can be attached to a closing parent.
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                 |
//! |-------------------|-----------------------------------------------------------|------------------------------------|
//! | **Processes**     | Create, enumerate and close nodes of the tree.            | [`Process`], [`State`]             |
//! | **Signals**       | One-shot broadcast events for closing/done.               | [`Signal`]                         |
//! | **Tasks**         | Describe a process: hooks, work body, idle policy.        | [`TaskSpec`], [`Hooks`], [`RunFn`] |
//! | **Errors**        | Typed errors for start failures and misuse.               | [`ProcessError`], [`TaskError`]    |
//! | **Configuration** | Settings shared by a tree.                                | [`Config`]                         |
//!
//! Logging goes through [`tracing`]: every process owns a span (`process.id`,
//! `process.label`) nested under its creator's span.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use proctree::{Process, ProcessError, TaskSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), ProcessError> {
//!     let root = Process::start(TaskSpec::new("root")).await?;
//!
//!     let worker = root
//!         .go("worker", |ctx: Process| async move {
//!             loop {
//!                 tokio::select! {
//!                     _ = ctx.closing().wait() => break,
//!                     _ = tokio::time::sleep(Duration::from_millis(10)) => {}
//!                 }
//!             }
//!         })
//!         .await?;
//!
//!     root.close()?;
//!     root.done().wait().await;
//!     assert!(worker.is_done());
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod process;
mod tasks;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{ProcessError, TaskError};
pub use process::{Process, Signal, State};
pub use tasks::{
    BoxRunFuture, Hooks, HooksRef, Run, RunFn, RunRef, TaskRef, TaskSpec, TaskSpecBuilder,
};
