use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use proctree::{Config, Hooks, Process, ProcessError, State, TaskError, TaskSpec};
use tokio::sync::Notify;
use tokio::time::{self, Instant, timeout};

/// Counts hook invocations and optionally fails `on_start`.
#[derive(Default)]
struct Recorder {
    fail_start: bool,
    starts: AtomicUsize,
    closings: AtomicUsize,
    closeds: AtomicUsize,
    children_done_at_closed: AtomicBool,
}

impl Recorder {
    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_start: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl Hooks for Recorder {
    async fn on_start(&self, _ctx: &Process) -> Result<(), TaskError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(TaskError::fail("refused"));
        }
        Ok(())
    }

    async fn on_closing(&self, _ctx: &Process) {
        self.closings.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_closed(&self, ctx: &Process) {
        self.closeds.fetch_add(1, Ordering::SeqCst);
        self.children_done_at_closed
            .store(ctx.children(Vec::new()).is_empty(), Ordering::SeqCst);
    }
}

fn recorded(label: &'static str, rec: &Arc<Recorder>) -> TaskSpec {
    TaskSpec::builder(label)
        .with_hooks_ref(rec.clone())
        .build()
}

async fn wait_done(p: &Process) {
    timeout(Duration::from_secs(5), p.done().wait())
        .await
        .unwrap_or_else(|_| panic!("process {} never finished closing", p.label()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_close_runs_hooks_once() {
    let rec = Arc::new(Recorder::default());
    let p = Process::start(recorded("target", &rec)).await.unwrap();

    let callers: Vec<_> = (0..32)
        .map(|_| {
            let p = p.clone();
            tokio::spawn(async move { p.close() })
        })
        .collect();
    for c in callers {
        assert!(c.await.unwrap().is_ok());
    }

    wait_done(&p).await;
    assert!(p.close().is_ok());
    assert_eq!(rec.closings.load(Ordering::SeqCst), 1);
    assert_eq!(rec.closeds.load(Ordering::SeqCst), 1);
    assert_eq!(p.state(), State::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn closing_root_closes_whole_tree_bottom_up() {
    let root_rec = Arc::new(Recorder::default());
    let root = Process::start(recorded("root", &root_rec)).await.unwrap();

    let mut all = Vec::new();
    let mut watchers = Vec::new();
    for i in 0..3 {
        let mid_rec = Arc::new(Recorder::default());
        let mid = root.start_child(recorded("mid", &mid_rec)).await.unwrap();
        for _ in 0..3 {
            let leaf = mid.start_child(TaskSpec::new("leaf")).await.unwrap();
            all.push(leaf);
        }
        // parent-after-children, observed from outside
        let watched = mid.clone();
        let leaves = mid.children(Vec::new());
        assert_eq!(leaves.len(), 3, "mid {i} should have 3 leaves");
        watchers.push(tokio::spawn(async move {
            watched.done().wait().await;
            assert!(leaves.iter().all(Process::is_done));
        }));
        all.push(mid);
    }
    assert_eq!(root.children(Vec::new()).len(), 3);

    root.close().unwrap();
    wait_done(&root).await;

    for w in watchers {
        w.await.unwrap();
    }
    assert!(all.iter().all(Process::is_done));
    assert!(root.children(Vec::new()).is_empty());
    assert!(root_rec.children_done_at_closed.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn closing_fires_top_down_and_breadth_first() {
    let root = Process::start(TaskSpec::new("root")).await.unwrap();
    let a = root.start_child(TaskSpec::new("a")).await.unwrap();
    let b = root.start_child(TaskSpec::new("b")).await.unwrap();
    let a1 = a.start_child(TaskSpec::new("a1")).await.unwrap();

    let observer = {
        let (root, a, b) = (root.clone(), a.clone(), b.clone());
        let a1 = a1.clone();
        tokio::spawn(async move {
            a1.closing().wait().await;
            assert!(a.closing().is_fired(), "parent must be signaled first");
            assert!(b.closing().is_fired(), "uncle must be signaled before grandchild");
            assert!(root.closing().is_fired());
        })
    };

    root.close().unwrap();
    wait_done(&root).await;
    observer.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrently_created_children_get_distinct_ids() {
    let root = Process::start(TaskSpec::new("root")).await.unwrap();

    let creators: Vec<_> = (0..64)
        .map(|_| {
            let root = root.clone();
            tokio::spawn(async move { root.start_child(TaskSpec::new("c")).await.map(|c| c.id()) })
        })
        .collect();

    let mut ids = HashSet::new();
    for c in creators {
        ids.insert(c.await.unwrap().unwrap());
    }
    assert_eq!(ids.len(), 64);
    assert!(!ids.contains(&root.id()));
    assert_eq!(root.children(Vec::new()).len(), 64);

    root.close().unwrap();
    wait_done(&root).await;
}

#[tokio::test]
async fn failed_start_rolls_child_back() {
    let root = Process::start(TaskSpec::new("root")).await.unwrap();
    let rec = Recorder::failing();
    let ran = Arc::new(AtomicBool::new(false));

    let spec = {
        let ran = ran.clone();
        TaskSpec::builder("doomed")
            .with_hooks_ref(rec.clone())
            .with_run(move |_ctx: Process| {
                let ran = ran.clone();
                async move { ran.store(true, Ordering::SeqCst) }
            })
            .build()
    };

    let err = root.start_child(spec).await.unwrap_err();
    match &err {
        ProcessError::Start { label, source } => {
            assert_eq!(label, "doomed");
            assert_eq!(source, &TaskError::fail("refused"));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(!ran.load(Ordering::SeqCst));
    assert!(root.children(Vec::new()).is_empty());
    assert_eq!(rec.starts.load(Ordering::SeqCst), 1);
    assert_eq!(rec.closings.load(Ordering::SeqCst), 1);
    assert_eq!(rec.closeds.load(Ordering::SeqCst), 1);
    assert_eq!(root.state(), State::Running);
}

#[tokio::test]
async fn failed_root_start_returns_error() {
    let rec = Recorder::failing();
    let err = Process::start(recorded("root", &rec)).await.unwrap_err();
    assert_eq!(err.as_label(), "process_start_failed");
    assert_eq!(rec.closeds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn closing_parent_rejects_new_children() {
    let root = Process::start(TaskSpec::new("root")).await.unwrap();
    let _child = root
        .go("busy", |ctx: Process| async move { ctx.closing().wait().await })
        .await
        .unwrap();

    root.close().unwrap();
    let err = root.start_child(TaskSpec::new("late")).await.unwrap_err();
    assert!(matches!(err, ProcessError::ParentClosed { parent, .. } if parent == root.id()));

    wait_done(&root).await;
    let err = root.start_child(TaskSpec::new("later")).await.unwrap_err();
    assert_eq!(err.as_label(), "process_parent_closed");
}

#[tokio::test]
async fn work_body_completion_closes_process() {
    let root = Process::start(TaskSpec::new("root")).await.unwrap();
    let job = root.go("job", |_ctx: Process| async {}).await.unwrap();

    wait_done(&job).await;
    assert_eq!(job.state(), State::Closed);
    assert!(root.children(Vec::new()).is_empty());
    assert!(!root.is_closing(), "close never propagates upward");
}

#[tokio::test]
async fn panicking_work_body_still_closes() {
    let root = Process::start(TaskSpec::new("root")).await.unwrap();
    let job = root
        .go("boom", |_ctx: Process| async { panic!("work body exploded") })
        .await
        .unwrap();

    wait_done(&job).await;
    root.close().unwrap();
    wait_done(&root).await;
}

#[tokio::test]
async fn work_body_can_close_itself() {
    let root = Process::start(TaskSpec::new("root")).await.unwrap();
    let job = root
        .go("self-close", |ctx: Process| async move {
            ctx.close().unwrap();
            ctx.closing().wait().await;
        })
        .await
        .unwrap();
    wait_done(&job).await;
}

#[tokio::test(start_paused = true)]
async fn rearming_idle_close_with_shorter_delay() {
    let p = Process::start(TaskSpec::new("idle")).await.unwrap();
    let t0 = Instant::now();

    p.close_when_idle(Duration::from_millis(100));
    time::sleep(Duration::from_millis(10)).await;
    p.close_when_idle(Duration::from_millis(20));

    p.closing().wait().await;
    let elapsed = t0.elapsed();
    assert!(elapsed >= Duration::from_millis(30), "closed too early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(100), "old deadline kept: {elapsed:?}");
    wait_done(&p).await;
}

#[tokio::test(start_paused = true)]
async fn idle_close_after_last_child_leaves() {
    let root = Process::start(
        TaskSpec::builder("pool")
            .with_idle_close(Duration::from_millis(50))
            .build(),
    )
    .await
    .unwrap();

    // a process with no children and no work body is idle from the start;
    // keep it busy before the first timer elapses
    let conn = root.start_child(TaskSpec::new("conn")).await.unwrap();
    time::sleep(Duration::from_millis(80)).await;
    assert!(!root.is_closing());

    let t0 = Instant::now();
    conn.close().unwrap();
    root.closing().wait().await;
    assert!(t0.elapsed() >= Duration::from_millis(50));
    wait_done(&root).await;
}

#[tokio::test(start_paused = true)]
async fn close_cascades_while_work_body_finishes() {
    let root = Process::start(TaskSpec::new("r")).await.unwrap();
    let rec = Arc::new(Recorder::default());
    let a = root
        .start_child(
            TaskSpec::builder("a")
                .with_hooks_ref(rec.clone())
                .with_run(|_ctx: Process| async {
                    time::sleep(Duration::from_millis(50)).await;
                })
                .build(),
        )
        .await
        .unwrap();

    let t0 = Instant::now();
    root.close().unwrap();

    a.closing().wait().await;
    assert!(t0.elapsed() < Duration::from_millis(5));
    time::sleep(Duration::from_millis(1)).await;
    assert_eq!(rec.closings.load(Ordering::SeqCst), 1);
    assert_eq!(rec.closeds.load(Ordering::SeqCst), 0);

    let order = Arc::new(Mutex::new(Vec::new()));
    let watch = |p: &Process| {
        let (p, order) = (p.clone(), order.clone());
        tokio::spawn(async move {
            p.done().wait().await;
            order.lock().push(p.label().to_string());
        })
    };
    let (wa, wr) = (watch(&a), watch(&root));

    wait_done(&root).await;
    wa.await.unwrap();
    wr.await.unwrap();

    assert!(t0.elapsed() >= Duration::from_millis(50));
    assert_eq!(rec.closeds.load(Ordering::SeqCst), 1);
    assert!(a.is_done());
    assert_eq!(order.lock().first().map(String::as_str), Some("a"));
}

#[tokio::test]
async fn accessors_and_weak_parent() {
    let root = Process::start(TaskSpec::new("root")).await.unwrap();
    let child = root
        .start_child(TaskSpec::builder("child").with_task_ref(7_u64).build())
        .await
        .unwrap();

    assert_eq!(child.label(), "child");
    assert_eq!(child.task_ref_as::<u64>(), Some(&7));
    assert!(child.task_ref_as::<String>().is_none());
    assert_eq!(child.parent().map(|p| p.id()), Some(root.id()));
    assert!(child.id() > root.id());

    let token = child.cancellation_token();
    token.cancel();
    assert!(!child.is_closing(), "cancelling the derived token must not close");

    let token = child.cancellation_token();
    child.close().unwrap();
    assert!(token.is_cancelled());
    wait_done(&child).await;

    let orphan = root.start_child(TaskSpec::new("orphan")).await.unwrap();
    drop(root);
    assert!(orphan.parent().is_none(), "a child must not keep its parent alive");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_from_thread_without_runtime() {
    let root = Process::start(TaskSpec::new("root")).await.unwrap();
    let child = root.start_child(TaskSpec::new("child")).await.unwrap();

    let handle = root.clone();
    std::thread::spawn(move || handle.close())
        .join()
        .expect("close panicked outside the runtime")
        .unwrap();

    wait_done(&root).await;
    assert!(child.is_done());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_when_idle_from_thread_without_runtime() {
    let root = Process::start(TaskSpec::new("root")).await.unwrap();
    let idle = root.start_child(TaskSpec::new("idle")).await.unwrap();

    let handle = idle.clone();
    std::thread::spawn(move || handle.close_when_idle(Duration::from_millis(10)))
        .join()
        .expect("close_when_idle panicked outside the runtime");

    wait_done(&idle).await;
    assert!(!root.is_closing());
}

#[tokio::test(start_paused = true)]
async fn work_body_with_idle_close_waits_for_children() {
    let root = Process::start(TaskSpec::new("root")).await.unwrap();
    let t0 = Instant::now();
    let worker = root
        .start_child(
            TaskSpec::builder("worker")
                .with_idle_close(Duration::from_millis(50))
                .with_run(|ctx: Process| async move {
                    ctx.go("helper", |_ctx: Process| async {
                        time::sleep(Duration::from_millis(30)).await;
                    })
                    .await
                    .unwrap();
                })
                .build(),
        )
        .await
        .unwrap();

    time::sleep(Duration::from_millis(5)).await;
    assert!(!worker.is_closing(), "a live child keeps the worker open");
    assert_eq!(worker.children(Vec::new()).len(), 1);

    worker.closing().wait().await;
    assert!(t0.elapsed() >= Duration::from_millis(80));
    wait_done(&worker).await;
    assert!(!root.is_closing());
}

#[tokio::test(start_paused = true)]
async fn go_outlives_its_body_while_children_remain() {
    let root = Process::start(TaskSpec::new("root")).await.unwrap();
    let job = root
        .go("job", |ctx: Process| async move {
            ctx.start_child(TaskSpec::new("held")).await.unwrap();
        })
        .await
        .unwrap();

    time::sleep(Duration::from_millis(10)).await;
    assert!(!job.is_closing());

    let held = job.children(Vec::new()).pop().expect("child started by the body");
    held.close().unwrap();
    wait_done(&job).await;
}

/// Records what a parent's hooks see of one child.
#[derive(Default)]
struct ChildWatch {
    child: OnceLock<Process>,
    seen: Mutex<Vec<(&'static str, bool)>>,
}

#[async_trait]
impl Hooks for ChildWatch {
    async fn on_closing(&self, _ctx: &Process) {
        let Some(child) = self.child.get() else {
            return;
        };
        time::sleep(Duration::from_millis(20)).await;
        self.seen.lock().push(("on_closing", child.is_closing()));
    }

    async fn on_closed(&self, _ctx: &Process) {
        if let Some(child) = self.child.get() {
            self.seen.lock().push(("on_closed", child.is_done()));
        }
    }
}

#[tokio::test]
async fn parent_hooks_bracket_child_close() {
    let watch = Arc::new(ChildWatch::default());
    let root = Process::start(
        TaskSpec::builder("root")
            .with_hooks_ref(watch.clone())
            .build(),
    )
    .await
    .unwrap();
    let child = root.start_child(TaskSpec::new("child")).await.unwrap();
    assert!(watch.child.set(child.clone()).is_ok());

    root.close().unwrap();
    wait_done(&root).await;

    assert!(child.is_done());
    assert_eq!(
        *watch.seen.lock(),
        vec![("on_closing", false), ("on_closed", true)]
    );
}

/// Blocks `on_start` until released.
#[derive(Default)]
struct Gate {
    entered: Notify,
    open: Notify,
    closings: AtomicUsize,
}

#[async_trait]
impl Hooks for Gate {
    async fn on_start(&self, _ctx: &Process) -> Result<(), TaskError> {
        self.entered.notify_one();
        self.open.notified().await;
        Ok(())
    }

    async fn on_closing(&self, _ctx: &Process) {
        self.closings.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn parent_closing_during_child_start() {
    let cfg = Config {
        stall_warning: Duration::from_millis(5),
    };
    let root = Process::start_with_config(cfg, TaskSpec::new("root"))
        .await
        .unwrap();
    let gate = Arc::new(Gate::default());
    let ran = Arc::new(AtomicBool::new(false));

    let spec = {
        let ran = ran.clone();
        TaskSpec::builder("slow")
            .with_hooks_ref(gate.clone())
            .with_run(move |_ctx: Process| {
                let ran = ran.clone();
                async move { ran.store(true, Ordering::SeqCst) }
            })
            .build()
    };
    let starting = {
        let root = root.clone();
        tokio::spawn(async move { root.start_child(spec).await })
    };

    gate.entered.notified().await;
    let linked = root.children(Vec::new()).pop().expect("child linked before on_start");
    assert_eq!(linked.config().stall_warning, Duration::from_millis(5));

    root.close().unwrap();
    linked.closing().wait().await;
    time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        gate.closings.load(Ordering::SeqCst),
        0,
        "on_closing must wait for on_start"
    );
    assert!(!root.is_done());

    gate.open.notify_one();
    let child = starting.await.unwrap().unwrap();
    assert_eq!(child.id(), linked.id());
    assert!(child.is_closing());

    wait_done(&root).await;
    assert!(child.is_done());
    assert!(!ran.load(Ordering::SeqCst));
    assert_eq!(gate.closings.load(Ordering::SeqCst), 1);
}
