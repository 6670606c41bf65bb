//! Session facade tying the engines to their external collaborators.
//!
//! The session owns the scheduler and the ports. Engines stay pure: the
//! session takes a snapshot, asks an engine for patches, and commits them
//! through the [`StateStore`]. Ledger updates hold the session's commit
//! lock from snapshot to commit so concurrent callers never build on the
//! same stale snapshot.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    tactic_key, AttemptInput, AttemptResult, Config, Patch, RankingConfig, SchedulerConfig,
    SuggestionEntry, SyncReason,
};
use crate::domain::ports::{
    ContextLoader, ExecutorOutcome, GoalHintLoader, StateStore, TacticExecutor, TacticRequest,
};
use crate::services::derivation::{derivation_patches, last_synced_patches, DerivationEngine};
use crate::services::recommendation::RecommendationEngine;
use crate::services::sync_scheduler::{ScheduleOptions, SyncRunner, SyncScheduler};

/// Executor outcome with `result` and `error_message` filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedOutcome {
    pub applied: bool,
    pub result: AttemptResult,
    pub error_message: Option<String>,
    pub duration_ms: Option<u64>,
}

/// Fill the gaps of a raw executor outcome.
///
/// A missing result follows `applied`. Non-success outcomes always carry a
/// message; a default one is supplied when the executor gave none.
pub fn normalize_outcome(outcome: ExecutorOutcome) -> NormalizedOutcome {
    let result = outcome.result.unwrap_or(if outcome.applied {
        AttemptResult::Success
    } else {
        AttemptResult::Error
    });

    let message = outcome
        .error_message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    let error_message = if result.is_success() {
        message
    } else {
        Some(message.unwrap_or_else(|| default_failure_message(result, outcome.applied).to_string()))
    };

    NormalizedOutcome {
        applied: outcome.applied,
        result,
        error_message,
        duration_ms: outcome.duration_ms,
    }
}

fn default_failure_message(result: AttemptResult, applied: bool) -> &'static str {
    match result {
        AttemptResult::Timeout => "tactic timed out",
        AttemptResult::Placeholder => "tactic left a placeholder",
        _ if !applied => "tactic was not applied",
        _ => "tactic failed",
    }
}

/// Runs one derivation cycle for a file and commits it.
struct DerivationRunner {
    store: Arc<dyn StateStore>,
    context_loader: Arc<dyn ContextLoader>,
    hint_loader: Option<Arc<dyn GoalHintLoader>>,
    engine: DerivationEngine,
}

#[async_trait]
impl SyncRunner for DerivationRunner {
    async fn run(&self, key: &str, reason: SyncReason) -> anyhow::Result<()> {
        let now = Utc::now();

        let patches = match self.context_loader.load_context(key).await {
            Ok(mut context) => {
                context.file_key = key.to_string();
                if let Some(hints) = &self.hint_loader {
                    match hints.load_hints(key).await {
                        Ok(extra) => context.goal_hints.extend(extra),
                        Err(err) => tracing::debug!(file_key = key, error = %err, "goal hints unavailable"),
                    }
                }
                derivation_patches(key, self.engine.derive(&context, now))
            }
            Err(err) => {
                tracing::warn!(file_key = key, error = %err, "context unavailable; keeping derived state");
                last_synced_patches(key, now)
            }
        };

        self.store.apply(&patches).await?;
        tracing::info!(file_key = key, reason = %reason, patches = patches.len(), "sync committed");
        Ok(())
    }
}

/// Outcome of [`ProofSession::apply_tactic`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTactic {
    pub outcome: NormalizedOutcome,
    pub patches: Vec<Patch>,
}

/// Builder for [`ProofSession`].
pub struct ProofSessionBuilder {
    store: Arc<dyn StateStore>,
    context_loader: Arc<dyn ContextLoader>,
    hint_loader: Option<Arc<dyn GoalHintLoader>>,
    executor: Option<Arc<dyn TacticExecutor>>,
    scheduler: SchedulerConfig,
    ranking: RankingConfig,
}

impl ProofSessionBuilder {
    pub fn goal_hints(mut self, loader: Arc<dyn GoalHintLoader>) -> Self {
        self.hint_loader = Some(loader);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn TacticExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler = config;
        self
    }

    pub fn ranking_config(mut self, config: RankingConfig) -> Self {
        self.ranking = config;
        self
    }

    /// Take scheduler and ranking settings from a loaded [`Config`].
    pub fn config(self, config: &Config) -> Self {
        self.scheduler_config(config.scheduler.clone())
            .ranking_config(config.ranking.clone())
    }

    pub fn build(self) -> ProofSession {
        let runner = Arc::new(DerivationRunner {
            store: Arc::clone(&self.store),
            context_loader: self.context_loader,
            hint_loader: self.hint_loader,
            engine: DerivationEngine::new(),
        });
        ProofSession {
            store: self.store,
            scheduler: SyncScheduler::new(runner, self.scheduler),
            executor: self.executor,
            engine: RecommendationEngine::new(self.ranking),
            commit_lock: Mutex::new(()),
        }
    }
}

/// Entry point for hosts: scheduling, attempt recording, suggestions and
/// tactic application.
pub struct ProofSession {
    store: Arc<dyn StateStore>,
    scheduler: SyncScheduler,
    executor: Option<Arc<dyn TacticExecutor>>,
    engine: RecommendationEngine,
    /// Serializes snapshot → engine → apply for ledger and cache updates
    commit_lock: Mutex<()>,
}

impl ProofSession {
    pub fn builder(
        store: Arc<dyn StateStore>,
        context_loader: Arc<dyn ContextLoader>,
    ) -> ProofSessionBuilder {
        ProofSessionBuilder {
            store,
            context_loader,
            hint_loader: None,
            executor: None,
            scheduler: SchedulerConfig::default(),
            ranking: RankingConfig::default(),
        }
    }

    pub fn scheduler(&self) -> &SyncScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Request a debounced re-derivation of `file_key`.
    pub fn schedule_sync(
        &self,
        file_key: &str,
        reason: SyncReason,
    ) -> impl Future<Output = ()> + Send + 'static {
        self.scheduler.schedule(file_key, reason, ScheduleOptions::default())
    }

    pub fn schedule_sync_with(
        &self,
        file_key: &str,
        reason: SyncReason,
        options: ScheduleOptions,
    ) -> impl Future<Output = ()> + Send + 'static {
        self.scheduler.schedule(file_key, reason, options)
    }

    /// Record an attempt and commit the resulting patches. Malformed input
    /// commits nothing and returns no patches.
    pub async fn record_attempt(&self, input: &AttemptInput) -> DomainResult<Vec<Patch>> {
        let _guard = self.commit_lock.lock().await;
        let state = self.store.snapshot().await?;
        let patches = self.engine.record(&state, input, Utc::now());
        if !patches.is_empty() {
            self.store.apply(&patches).await?;
        }
        Ok(patches)
    }

    /// Rank tactics for an obligation, cache the result, and return it.
    pub async fn suggest(&self, file_key: &str, node_id: &str) -> DomainResult<Vec<SuggestionEntry>> {
        let _guard = self.commit_lock.lock().await;
        let state = self.store.snapshot().await?;
        let Some(refresh) = self.engine.refresh_slot(&state, file_key, node_id, Utc::now()) else {
            return Ok(Vec::new());
        };
        self.store.apply(&refresh.patches).await?;
        Ok(refresh.slot.entries)
    }

    /// Execute a tactic, record its normalized outcome, and resync the file.
    pub async fn apply_tactic(
        &self,
        file_key: &str,
        node_id: &str,
        tactic: &str,
    ) -> DomainResult<AppliedTactic> {
        let executor = self
            .executor
            .as_ref()
            .ok_or_else(|| DomainError::ExecutionFailed("no tactic executor configured".to_string()))?;
        let key = tactic_key(tactic)
            .ok_or_else(|| DomainError::ValidationFailed(format!("no tactic in {tactic:?}")))?;

        let state = self.store.snapshot().await?;
        let category = self.engine.resolve_category(&state, file_key, node_id);

        let request = TacticRequest {
            file_key: file_key.to_string(),
            node_id: node_id.to_string(),
            tactic: tactic.to_string(),
            tactic_key: key.clone(),
        };
        let raw = executor.apply(request).await.unwrap_or_else(|err| {
            tracing::warn!(file_key, node_id, tactic_key = %key, error = %err, "tactic executor failed");
            ExecutorOutcome {
                applied: false,
                error_message: Some(err.to_string()),
                ..ExecutorOutcome::default()
            }
        });
        let outcome = normalize_outcome(raw);

        let input = AttemptInput {
            file_key: file_key.to_string(),
            node_id: node_id.to_string(),
            tactic: tactic.to_string(),
            tactic_key: Some(key),
            result: outcome.result,
            context_error_category: category,
            error_message: outcome.error_message.clone(),
            duration_ms: outcome.duration_ms,
            goal_text: None,
        };
        let patches = self.record_attempt(&input).await?;

        self.schedule_sync(file_key, SyncReason::Apply).await;

        Ok(AppliedTactic { outcome, patches })
    }

    /// Cancel pending syncs and release every waiter.
    pub fn shutdown(&self) {
        self.scheduler.clear();
    }
}

impl std::fmt::Debug for ProofSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofSession")
            .field("scheduler", &self.scheduler)
            .field("has_executor", &self.executor.is_some())
            .field("ranking", self.engine.config())
            .finish()
    }
}
