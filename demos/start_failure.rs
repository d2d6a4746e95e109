//! # Example: start_failure
//!
//! A child whose `on_start` fails is rolled back before the error is returned.
//!
//! Demonstrates how to:
//! - Implement [`Hooks`] for a process.
//! - Handle [`ProcessError::Start`] from [`Process::start_child`].
//! - Rely on `on_closing`/`on_closed` running for the failed child.
//!
//! ## Flow
//! ```text
//! root.start_child(db)
//!   ├─► on_start ─► Err(Fail)
//!   ├─► on_closing ─► on_closed ─► done
//!   └─► Err(ProcessError::Start { source: Fail })
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example start_failure
//! ```

use async_trait::async_trait;
use proctree::{Hooks, Process, ProcessError, TaskError, TaskSpec};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct Database {
    url: &'static str,
}

#[async_trait]
impl Hooks for Database {
    async fn on_start(&self, ctx: &Process) -> Result<(), TaskError> {
        info!(id = ctx.id(), url = self.url, "connecting");
        Err(TaskError::fail(format!("connection refused: {}", self.url)))
    }

    async fn on_closing(&self, _ctx: &Process) {
        info!("closing database handle");
    }

    async fn on_closed(&self, _ctx: &Process) {
        info!("database handle released");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let root = Process::start(TaskSpec::new("root")).await?;

    let spec = TaskSpec::builder("db")
        .with_hooks(Database {
            url: "postgres://localhost:5432",
        })
        .with_run(|_ctx: Process| async { info!("never printed: the work body is skipped") })
        .build();

    match root.start_child(spec).await {
        Ok(_) => unreachable!("on_start always fails here"),
        Err(ProcessError::Start { label, source }) => {
            warn!(%label, retryable = source.is_retryable(), error = %source, "start failed");
        }
        Err(other) => return Err(other.into()),
    }
    info!(children = root.children(Vec::new()).len(), "root left intact");

    root.close()?;
    root.done().wait().await;
    Ok(())
}
