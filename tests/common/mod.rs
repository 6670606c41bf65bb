//! Common test utilities for integration tests
//!
//! Provides in-memory port implementations and fixtures shared across
//! the integration test files.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use proofsync::domain::models::{DerivationContext, Diagnostic, SyncReason};
use proofsync::domain::ports::{ContextLoader, ExecutorOutcome, TacticExecutor, TacticRequest};
use proofsync::services::SyncRunner;
use proofsync::{DomainError, DomainResult};

/// A fixed instant so tests that derive or rank are deterministic.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub const NAT_SOURCE: &str = "\
theorem add_zero' (n : Nat) : n + 0 = n := by
  simp

lemma zero_add' (n : Nat) : 0 + n = n := by
  sorry

theorem broken (n : Nat) : n = n + 1 := by
  omega
";

/// Context for [`NAT_SOURCE`] with one error on the `broken` theorem.
pub fn nat_context(file_key: &str) -> DerivationContext {
    DerivationContext::new(file_key, NAT_SOURCE)
        .with_diagnostics(vec![Diagnostic::error("omega could not prove the goal", 8)])
}

/// Context loader serving contexts registered by the test.
#[derive(Default)]
pub struct StaticContextLoader {
    contexts: Mutex<HashMap<String, DerivationContext>>,
    loads: AtomicUsize,
}

impl StaticContextLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, context: DerivationContext) {
        self.contexts.lock().unwrap().insert(context.file_key.clone(), context);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextLoader for StaticContextLoader {
    async fn load_context(&self, file_key: &str) -> DomainResult<DerivationContext> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.contexts
            .lock()
            .unwrap()
            .get(file_key)
            .cloned()
            .ok_or_else(|| DomainError::ContextUnavailable {
                file_key: file_key.to_string(),
                reason: "not registered".to_string(),
            })
    }
}

/// Executor replaying scripted outcomes in order and remembering requests.
#[derive(Default)]
pub struct ScriptedExecutor {
    outcomes: Mutex<VecDeque<DomainResult<ExecutorOutcome>>>,
    requests: Mutex<Vec<TacticRequest>>,
}

impl ScriptedExecutor {
    pub fn new(outcomes: Vec<DomainResult<ExecutorOutcome>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<TacticRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TacticExecutor for ScriptedExecutor {
    async fn apply(&self, request: TacticRequest) -> DomainResult<ExecutorOutcome> {
        self.requests.lock().unwrap().push(request);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ExecutorOutcome::default()))
    }
}

/// Sync runner that records each run and can be slowed down or made to fail.
#[derive(Default)]
pub struct RecordingRunner {
    runs: Mutex<Vec<(String, SyncReason)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
    fail: bool,
}

impl RecordingRunner {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn runs(&self) -> Vec<(String, SyncReason)> {
        self.runs.lock().unwrap().clone()
    }

    pub fn run_count(&self, key: &str) -> usize {
        self.runs.lock().unwrap().iter().filter(|(k, _)| k == key).count()
    }

    /// Highest number of runs observed executing at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncRunner for RecordingRunner {
    async fn run(&self, key: &str, reason: SyncReason) -> anyhow::Result<()> {
        self.runs.lock().unwrap().push((key.to_string(), reason));
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("runner failed for {key}");
        }
        Ok(())
    }
}
