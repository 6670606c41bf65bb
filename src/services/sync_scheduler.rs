//! Per-key debounced sync scheduler.
//!
//! Bursts of sync requests for the same key are coalesced into a single run.
//! Each key moves through an explicit state machine:
//!
//! ```text
//! Idle --request--> Debouncing --timer--> Running --finished--> Idle
//!                     ^   |request                 |pending
//!                     +---+ (re-arm)               v
//!                                             Debouncing
//! ```
//!
//! Requests that arrive while a key is running are queued and trigger
//! exactly one follow-up cycle. Different keys run independently.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::domain::models::{SchedulerConfig, SyncReason};

/// Work performed once per coalesced sync cycle.
#[async_trait]
pub trait SyncRunner: Send + Sync {
    /// Sync `key` once. Errors are logged by the scheduler and never retried.
    async fn run(&self, key: &str, reason: SyncReason) -> anyhow::Result<()>;
}

/// Best-effort callback executed after a run, before waiters resolve.
pub type PostRunTask = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// Per-request options.
#[derive(Default)]
pub struct ScheduleOptions {
    /// Runs after the covering sync, before its waiters resolve
    pub after_sync: Option<PostRunTask>,
    /// Replaces the per-reason debounce; negative values mean "now".
    pub debounce_override_ms: Option<i64>,
}

impl ScheduleOptions {
    /// Attach a post-run task.
    pub fn after_sync<F, Fut>(mut self, task: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.after_sync = Some(Box::new(move || task().boxed()));
        self
    }

    /// Override the per-reason debounce for this request.
    pub fn debounce_ms(mut self, ms: i64) -> Self {
        self.debounce_override_ms = Some(ms);
        self
    }
}

impl std::fmt::Debug for ScheduleOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleOptions")
            .field("after_sync", &self.after_sync.is_some())
            .field("debounce_override_ms", &self.debounce_override_ms)
            .finish()
    }
}

/// Lifecycle phase of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing pending
    Idle,
    /// Timer armed
    Debouncing,
    /// Runner in flight
    Running,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Debouncing => "debouncing",
            Self::Running => "running",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Request,
    TimerFired,
    RunFinished { pending: bool },
    Clear,
}

/// Transition table. Events that do not apply to a phase leave it as is.
fn next_phase(phase: Phase, event: Event) -> Phase {
    match (phase, event) {
        (Phase::Running, Event::Clear) => Phase::Running,
        (_, Event::Clear) => Phase::Idle,
        (Phase::Idle | Phase::Debouncing, Event::Request) => Phase::Debouncing,
        (Phase::Running, Event::Request) => Phase::Running,
        (Phase::Debouncing, Event::TimerFired) => Phase::Running,
        (Phase::Running, Event::RunFinished { pending: true }) => Phase::Debouncing,
        (Phase::Running, Event::RunFinished { pending: false }) => Phase::Idle,
        (phase, _) => phase,
    }
}

struct KeyEntry {
    /// Distinguishes this entry from a later one for the same key
    epoch: u64,
    phase: Phase,
    timer: Option<JoinHandle<()>>,
    timer_token: u64,
    queued: bool,
    reason: SyncReason,
    override_ms: Option<i64>,
    waiters: Vec<oneshot::Sender<()>>,
    tasks: Vec<PostRunTask>,
}

impl KeyEntry {
    fn new(epoch: u64, reason: SyncReason) -> Self {
        Self {
            epoch,
            phase: Phase::Idle,
            timer: None,
            timer_token: 0,
            queued: false,
            reason,
            override_ms: None,
            waiters: Vec::new(),
            tasks: Vec::new(),
        }
    }

    fn apply(&mut self, event: Event) {
        self.phase = next_phase(self.phase, event);
    }

    fn has_pending(&self) -> bool {
        self.queued || !self.waiters.is_empty() || !self.tasks.is_empty()
    }
}

struct Inner {
    runner: Arc<dyn SyncRunner>,
    config: SchedulerConfig,
    entries: Mutex<HashMap<String, KeyEntry>>,
    ids: AtomicU64,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, KeyEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> u64 {
        self.ids.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn delay_for(&self, entry: &KeyEntry) -> Duration {
        let configured = i64::try_from(self.config.debounce_ms(entry.reason)).unwrap_or(i64::MAX);
        let ms = entry.override_ms.unwrap_or(configured).max(0);
        Duration::from_millis(u64::try_from(ms).unwrap_or(0))
    }
}

/// Arm (or re-arm) the debounce timer of `entry`.
fn arm(inner: &Arc<Inner>, key: &str, entry: &mut KeyEntry) {
    if let Some(timer) = entry.timer.take() {
        timer.abort();
    }
    let delay = inner.delay_for(entry);
    let token = inner.next_id();
    entry.timer_token = token;

    tracing::trace!(key, reason = %entry.reason, delay = ?delay, "debounce armed");

    let inner = Arc::clone(inner);
    let key = key.to_string();
    entry.timer = Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        fire(inner, key, token).await;
    }));
}

async fn fire(inner: Arc<Inner>, key: String, token: u64) {
    let (epoch, reason, waiters, tasks) = {
        let mut entries = inner.entries();
        let Some(entry) = entries.get_mut(&key) else {
            return;
        };
        if entry.timer_token != token || entry.phase != Phase::Debouncing {
            return;
        }
        // the run continues inside this task; clear() must not abort it
        entry.timer = None;
        entry.queued = false;
        entry.apply(Event::TimerFired);
        (
            entry.epoch,
            entry.reason,
            std::mem::take(&mut entry.waiters),
            std::mem::take(&mut entry.tasks),
        )
    };

    tracing::debug!(key = %key, reason = %reason, waiters = waiters.len(), "sync run started");

    match AssertUnwindSafe(inner.runner.run(&key, reason)).catch_unwind().await {
        Ok(Ok(())) => tracing::debug!(key = %key, "sync run finished"),
        Ok(Err(err)) => tracing::warn!(key = %key, error = %err, "sync run failed"),
        Err(_) => tracing::error!(key = %key, "sync run panicked"),
    }

    for task in tasks {
        match AssertUnwindSafe(async move { task().await }).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(key = %key, error = %err, "post-sync task failed"),
            Err(_) => tracing::warn!(key = %key, "post-sync task panicked"),
        }
    }

    finish(&inner, &key, epoch);

    for waiter in waiters {
        let _ = waiter.send(());
    }
}

/// Leave the running phase: arm a follow-up cycle when requests arrived
/// during the run, otherwise drop the entry.
fn finish(inner: &Arc<Inner>, key: &str, epoch: u64) {
    let mut entries = inner.entries();
    let Some(entry) = entries.get_mut(key) else {
        return;
    };
    if entry.epoch != epoch || entry.phase != Phase::Running {
        return;
    }
    let pending = entry.has_pending();
    entry.apply(Event::RunFinished { pending });
    if pending {
        entry.queued = false;
        tracing::debug!(key, reason = %entry.reason, "follow-up sync queued");
        arm(inner, key, entry);
    } else {
        entries.remove(key);
    }
}

/// Debounced, coalescing scheduler keyed by file.
#[derive(Clone)]
pub struct SyncScheduler {
    inner: Arc<Inner>,
}

impl SyncScheduler {
    pub fn new(runner: Arc<dyn SyncRunner>, config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                runner,
                config,
                entries: Mutex::new(HashMap::new()),
                ids: AtomicU64::new(0),
            }),
        }
    }

    /// Request a sync of `key`.
    ///
    /// The request is registered immediately; the returned future resolves
    /// once the run that covers this request (and its post-run tasks) has
    /// completed, or when the scheduler is cleared. Must be called from
    /// within a Tokio runtime.
    pub fn schedule(
        &self,
        key: &str,
        reason: SyncReason,
        options: ScheduleOptions,
    ) -> impl std::future::Future<Output = ()> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        {
            let mut entries = self.inner.entries();
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| KeyEntry::new(self.inner.next_id(), reason));

            entry.waiters.push(tx);
            if let Some(task) = options.after_sync {
                entry.tasks.push(task);
            }
            entry.reason = reason;
            entry.override_ms = options.debounce_override_ms;

            if entry.phase == Phase::Running {
                entry.queued = true;
                tracing::trace!(key, reason = %reason, "sync queued behind running cycle");
            } else {
                arm(&self.inner, key, entry);
            }
            entry.apply(Event::Request);
        }

        async move {
            let _ = rx.await;
        }
    }

    /// Current phase of `key`; keys without an entry are idle.
    pub fn phase(&self, key: &str) -> Phase {
        self.inner.entries().get(key).map_or(Phase::Idle, |e| e.phase)
    }

    /// Number of keys with a pending or running cycle.
    pub fn active_keys(&self) -> usize {
        self.inner.entries().len()
    }

    /// Cancel pending timers, resolve outstanding waiters without running,
    /// and drop every idle or debouncing entry.
    ///
    /// A key that is mid-run keeps its entry so later requests queue behind
    /// that run instead of starting a second one. Its queued requests are
    /// dropped; the waiters captured by the run resolve when it ends.
    pub fn clear(&self) {
        let mut resolved = 0usize;
        let mut cancelled = Vec::new();
        {
            let mut entries = self.inner.entries();
            entries.retain(|_, entry| {
                if let Some(timer) = entry.timer.take() {
                    timer.abort();
                }
                entry.queued = false;
                entry.tasks.clear();
                resolved += entry.waiters.len();
                cancelled.append(&mut entry.waiters);
                entry.apply(Event::Clear);
                entry.phase == Phase::Running
            });
        }
        for waiter in cancelled {
            let _ = waiter.send(());
        }
        tracing::debug!(resolved_waiters = resolved, "sync scheduler cleared");
    }
}

impl std::fmt::Debug for SyncScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncScheduler")
            .field("config", &self.inner.config)
            .field("active_keys", &self.active_keys())
            .finish()
    }
}
