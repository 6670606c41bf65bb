//! Timing and isolation behaviour of the sync scheduler, on a paused clock.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::RecordingRunner;
use proofsync::domain::models::{SchedulerConfig, SyncReason};
use proofsync::services::{Phase, ScheduleOptions, SyncScheduler};

fn scheduler_with(runner: RecordingRunner) -> (SyncScheduler, Arc<RecordingRunner>) {
    let runner = Arc::new(runner);
    (SyncScheduler::new(runner.clone(), SchedulerConfig::default()), runner)
}

fn explode() -> anyhow::Result<()> {
    panic!("post-run task exploded")
}

#[tokio::test(start_paused = true)]
async fn test_burst_coalesces_into_one_run() {
    let (scheduler, runner) = scheduler_with(RecordingRunner::default());
    let finished = Arc::new(AtomicBool::new(false));

    let mut waiters = Vec::new();
    for i in 0..5 {
        let options = if i == 0 {
            let finished = finished.clone();
            ScheduleOptions::default().after_sync(move || async move {
                finished.store(true, Ordering::SeqCst);
                anyhow::Ok(())
            })
        } else {
            ScheduleOptions::default()
        };
        let done = scheduler.schedule("Main.lean", SyncReason::Save, options);
        let finished = finished.clone();
        waiters.push(tokio::spawn(async move {
            done.await;
            finished.load(Ordering::SeqCst)
        }));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    for waiter in waiters {
        assert!(waiter.await.unwrap(), "waiter resolved before the post-run task");
    }
    assert_eq!(runner.run_count("Main.lean"), 1);
    assert_eq!(scheduler.phase("Main.lean"), Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_requests_during_run_get_one_follow_up() {
    let (scheduler, runner) = scheduler_with(RecordingRunner::with_delay(Duration::from_secs(1)));

    let first = scheduler.schedule("Main.lean", SyncReason::Save, ScheduleOptions::default().debounce_ms(0));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(scheduler.phase("Main.lean"), Phase::Running);

    let later: Vec<_> = (0..3)
        .map(|_| scheduler.schedule("Main.lean", SyncReason::Diagnostics, ScheduleOptions::default()))
        .collect();

    first.await;
    assert_eq!(runner.run_count("Main.lean"), 1);
    assert_eq!(scheduler.phase("Main.lean"), Phase::Debouncing);

    futures::future::join_all(later).await;
    assert_eq!(
        runner.runs(),
        vec![
            ("Main.lean".to_string(), SyncReason::Save),
            ("Main.lean".to_string(), SyncReason::Diagnostics),
        ]
    );
    assert_eq!(scheduler.active_keys(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_post_run_failures_are_isolated() {
    let (scheduler, runner) = scheduler_with(RecordingRunner::failing());
    let survivor = Arc::new(AtomicUsize::new(0));

    let failing = scheduler.schedule(
        "Main.lean",
        SyncReason::Save,
        ScheduleOptions::default().after_sync(|| async { Err::<(), _>(anyhow::anyhow!("post-run task failed")) }),
    );
    let panicking = scheduler.schedule(
        "Main.lean",
        SyncReason::Save,
        ScheduleOptions::default().after_sync(|| async { explode() }),
    );
    let counter = survivor.clone();
    let healthy = scheduler.schedule(
        "Main.lean",
        SyncReason::Save,
        ScheduleOptions::default().after_sync(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            anyhow::Ok(())
        }),
    );

    futures::join!(failing, panicking, healthy);
    assert_eq!(runner.run_count("Main.lean"), 1);
    assert_eq!(survivor.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.phase("Main.lean"), Phase::Idle);

    // the scheduler keeps working after a failed cycle
    scheduler.schedule("Main.lean", SyncReason::Save, ScheduleOptions::default()).await;
    assert_eq!(runner.run_count("Main.lean"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_clear_resolves_without_running() {
    let (scheduler, runner) = scheduler_with(RecordingRunner::default());
    let a = scheduler.schedule("A.lean", SyncReason::Save, ScheduleOptions::default());
    let b = scheduler.schedule("B.lean", SyncReason::Activate, ScheduleOptions::default());

    scheduler.clear();
    futures::join!(a, b);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(runner.runs().is_empty());
    assert_eq!(scheduler.active_keys(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_request_after_clear_waits_for_in_flight_run() {
    let (scheduler, runner) = scheduler_with(RecordingRunner::with_delay(Duration::from_secs(1)));

    let first = scheduler.schedule("Main.lean", SyncReason::Save, ScheduleOptions::default().debounce_ms(0));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(scheduler.phase("Main.lean"), Phase::Running);

    let dropped = scheduler.schedule("Main.lean", SyncReason::Diagnostics, ScheduleOptions::default());
    scheduler.clear();
    dropped.await;
    assert_eq!(scheduler.phase("Main.lean"), Phase::Running);

    let second = scheduler.schedule("Main.lean", SyncReason::Apply, ScheduleOptions::default().debounce_ms(0));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(runner.run_count("Main.lean"), 1, "second run started before the first ended");

    futures::join!(first, second);
    assert_eq!(runner.max_in_flight(), 1);
    assert_eq!(
        runner.runs(),
        vec![
            ("Main.lean".to_string(), SyncReason::Save),
            ("Main.lean".to_string(), SyncReason::Apply),
        ]
    );
    assert_eq!(scheduler.active_keys(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_keys_debounce_independently() {
    let (scheduler, runner) = scheduler_with(RecordingRunner::default());
    let save = scheduler.schedule("A.lean", SyncReason::Save, ScheduleOptions::default());
    let diagnostics = scheduler.schedule("B.lean", SyncReason::Diagnostics, ScheduleOptions::default());

    save.await;
    assert_eq!(runner.run_count("A.lean"), 1);
    assert_eq!(runner.run_count("B.lean"), 0);
    assert_eq!(scheduler.phase("B.lean"), Phase::Debouncing);

    diagnostics.await;
    assert_eq!(runner.run_count("B.lean"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_latest_reason_wins() {
    let (scheduler, runner) = scheduler_with(RecordingRunner::default());
    let save = scheduler.schedule("Main.lean", SyncReason::Save, ScheduleOptions::default());
    let diagnostics = scheduler.schedule("Main.lean", SyncReason::Diagnostics, ScheduleOptions::default());

    futures::join!(save, diagnostics);
    assert_eq!(runner.runs(), vec![("Main.lean".to_string(), SyncReason::Diagnostics)]);
}
