//! # Example: idle_close
//!
//! A connection pool that shuts itself down once its last connection is gone.
//!
//! Demonstrates how to:
//! - Configure [`TaskSpec::builder`] with an idle-close delay.
//! - Attach short-lived children that close on their own.
//! - Observe the parent closing after the idle delay without calling `close()`.
//!
//! ## Flow
//! ```text
//! pool (idle_close = 300ms)
//!  ├─► conn-1 (200ms) ─┐
//!  ├─► conn-2 (400ms) ─┼─► last one leaves at ~600ms
//!  └─► conn-3 (600ms) ─┘
//!                          └─► +300ms idle ─► pool.close()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=trace cargo run --example idle_close
//! ```

use std::time::Duration;

use proctree::{Process, TaskSpec};
use tokio::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let t0 = Instant::now();
    let pool = Process::start(
        TaskSpec::builder("pool")
            .with_idle_close(Duration::from_millis(300))
            .build(),
    )
    .await?;

    for i in 1..=3_u64 {
        let spec = TaskSpec::builder(format!("conn-{i}"))
            .with_task_ref(Duration::from_millis(200 * i))
            .with_run(|ctx: Process| async move {
                let hold = ctx.task_ref_as::<Duration>().copied().unwrap_or_default();
                tokio::time::sleep(hold).await;
                info!(held = ?hold, "connection released");
            })
            .build();
        pool.start_child(spec).await?;
    }

    pool.closing().wait().await;
    info!(after = ?t0.elapsed(), "pool idle, closing");

    pool.done().wait().await;
    info!(after = ?t0.elapsed(), "pool closed");
    Ok(())
}
