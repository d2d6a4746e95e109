//! # Example: basic_tree
//!
//! A small tree of workers shut down from the root.
//!
//! Demonstrates how to:
//! - Start a root [`Process`] and attach children with [`Process::go`].
//! - Nest a second level under one of the children.
//! - Close the root and wait until the whole tree is done.
//!
//! ## Flow
//! ```text
//! root
//!  ├─► ticker-1 ──► ticks until closing
//!  └─► group
//!        ├─► ticker-2
//!        └─► ticker-3
//!
//! root.close()
//!  ├─► closing: root ─► ticker-1, group ─► ticker-2, ticker-3
//!  └─► done:    ticker-2, ticker-3 ─► group, ticker-1 ─► root
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example basic_tree
//! ```

use std::time::Duration;

use proctree::{Process, TaskSpec};
use tracing::info;
use tracing_subscriber::EnvFilter;

async fn ticker(ctx: Process) {
    let mut n = 0_u32;
    loop {
        tokio::select! {
            _ = ctx.closing().wait() => break,
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                n += 1;
                info!(tick = n, "tick");
            }
        }
    }
    info!(ticks = n, "ticker stopping");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 1. Root holds everything; it has no work of its own
    let root = Process::start(TaskSpec::new("root")).await?;

    // 2. Leaf workers close themselves when their body returns
    root.go("ticker-1", ticker).await?;

    // 3. A passive group with two workers under it
    let group = root.start_child(TaskSpec::new("group")).await?;
    group.go("ticker-2", ticker).await?;
    group.go("ticker-3", ticker).await?;

    let open = root.children(Vec::new());
    info!(children = ?open.iter().map(Process::label).collect::<Vec<_>>(), "tree running");

    tokio::time::sleep(Duration::from_secs(1)).await;

    // 4. Close cascades down; done comes back up
    root.close()?;
    root.done().wait().await;

    info!(group_done = group.is_done(), "tree closed");
    Ok(())
}
