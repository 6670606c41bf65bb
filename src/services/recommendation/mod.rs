//! Tactic recommendation engine.
//!
//! Three cooperating parts: the per-obligation attempt [`ledger`], the
//! global [`patterns`] table, and the [`ranker`] that merges both into a
//! scored suggestion list. The engine reads an immutable [`ProofState`]
//! snapshot and returns patches; it never writes state itself.

pub mod ledger;
pub mod patterns;
pub mod ranker;

use chrono::{DateTime, Duration, Utc};

use crate::domain::models::{
    paths, suggestion_slot_key, AttemptInput, ErrorCategory, Patch, ProofState, RankingConfig,
    SuggestionEntry, SuggestionSlot,
};
use crate::services::goal_signature::goal_signature;

use ranker::RankTarget;

/// A freshly ranked suggestion slot and the patches that persist it.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRefresh {
    pub slot: SuggestionSlot,
    pub patches: Vec<Patch>,
}

/// Records attempts and ranks tactics for obligations.
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    config: RankingConfig,
}

impl RecommendationEngine {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Patches recording one attempt: the ledger append, the rolled node
    /// counters, and the updated pattern entry.
    ///
    /// Malformed input (blank file, node or tactic) yields no patches.
    pub fn record(&self, state: &ProofState, input: &AttemptInput, now: DateTime<Utc>) -> Vec<Patch> {
        let Some(tactic_key) = input.resolved_tactic_key() else {
            tracing::debug!(
                file_key = %input.file_key,
                node_id = %input.node_id,
                "ignoring malformed attempt"
            );
            return Vec::new();
        };

        let history = state.node_history(&input.file_key, &input.node_id);
        let record = ledger::next_record(history, input, &tactic_key, now);

        let signature = input
            .goal_text
            .as_deref()
            .or_else(|| {
                state
                    .goal_for_node(&input.file_key, &input.node_id)
                    .map(|g| g.matching_text())
            })
            .and_then(goal_signature);

        let entry = patterns::observe_attempt(state, &record, signature, now);

        tracing::info!(
            file_key = %record.file_key,
            node_id = %record.node_id,
            attempt_id = %record.id,
            tactic_key = %record.tactic_key,
            result = record.result.as_str(),
            pattern = %entry.key,
            pattern_score = entry.score,
            "recorded tactic attempt"
        );

        let mut patches = ledger::ledger_patches(history, &record);
        patches.push(patterns::pattern_patch(&entry));
        patches
    }

    /// Error category of an obligation: the live graph's category, then
    /// `unsolved_goals` for an open node, then the latest attempt's category.
    pub fn resolve_category(
        &self,
        state: &ProofState,
        file_key: &str,
        node_id: &str,
    ) -> Option<ErrorCategory> {
        if let Some(node) = state.node(file_key, node_id) {
            if let Some(category) = node.error_category {
                return Some(category);
            }
            if node.status.is_open() {
                return Some(ErrorCategory::UnsolvedGoals);
            }
        }
        state
            .node_history(file_key, node_id)
            .and_then(|h| h.latest())
            .map(|record| record.category_or_default())
    }

    fn target(&self, state: &ProofState, file_key: &str, node_id: &str) -> Option<RankTarget> {
        if file_key.trim().is_empty() || node_id.trim().is_empty() {
            return None;
        }
        let category = self.resolve_category(state, file_key, node_id)?;
        let goal_signature = state
            .goal_for_node(file_key, node_id)
            .and_then(|g| goal_signature(g.matching_text()));
        Some(RankTarget {
            node_id: node_id.to_string(),
            category,
            goal_signature,
        })
    }

    /// Ranked suggestions for one obligation, or `None` when the obligation
    /// or its category cannot be resolved.
    pub fn rank(
        &self,
        state: &ProofState,
        file_key: &str,
        node_id: &str,
        now: DateTime<Utc>,
    ) -> Option<Vec<SuggestionEntry>> {
        let target = self.target(state, file_key, node_id)?;
        let local = state
            .node_history(file_key, node_id)
            .map(ledger::local_aggregates)
            .unwrap_or_default();
        let candidates = ranker::collect_candidates(state.patterns.values(), &local);
        Some(ranker::rank_candidates(candidates, &target, &self.config, now))
    }

    /// Patches refreshing the suggestion slot of one obligation, plus TTL
    /// pruning and capacity eviction of other slots.
    pub fn suggest(
        &self,
        state: &ProofState,
        file_key: &str,
        node_id: &str,
        now: DateTime<Utc>,
    ) -> Vec<Patch> {
        self.refresh_slot(state, file_key, node_id, now)
            .map(|refresh| refresh.patches)
            .unwrap_or_default()
    }

    /// Like [`suggest`](Self::suggest), but also hands back the new slot.
    pub fn refresh_slot(
        &self,
        state: &ProofState,
        file_key: &str,
        node_id: &str,
        now: DateTime<Utc>,
    ) -> Option<SlotRefresh> {
        let generated_at = next_generation(state, now);
        let Some(mut entries) = self.rank(state, file_key, node_id, generated_at) else {
            tracing::debug!(file_key, node_id, "no category for obligation; skipping suggest");
            return None;
        };
        for entry in &mut entries {
            entry.generated_at = generated_at;
        }

        tracing::debug!(
            file_key,
            node_id,
            suggestions = entries.len(),
            top = entries.first().map_or("-", |e| e.tactic_key.as_str()),
            "ranked suggestions"
        );

        let slot_key = suggestion_slot_key(file_key, node_id);
        let slot = SuggestionSlot {
            file_key: file_key.to_string(),
            node_id: node_id.to_string(),
            entries,
            generated_at,
        };

        let mut patches = vec![Patch::set(paths::suggestion_slot(&slot_key), &slot)];
        patches.extend(
            self.stale_slots(state, &slot_key, generated_at)
                .into_iter()
                .map(|key| Patch::unset(paths::suggestion_slot(&key))),
        );
        Some(SlotRefresh { slot, patches })
    }

    /// Slot keys to drop: expired slots, then the oldest survivors beyond
    /// the cache capacity. The slot being written is never dropped.
    fn stale_slots(&self, state: &ProofState, current: &str, now: DateTime<Utc>) -> Vec<String> {
        let ttl_secs = i64::try_from(self.config.cache_ttl_secs).unwrap_or(i64::MAX);
        let ttl = Duration::seconds(ttl_secs.min(i64::MAX / 1000));
        let cutoff = now.checked_sub_signed(ttl);

        let mut stale = Vec::new();
        let mut survivors: Vec<(&String, DateTime<Utc>)> = Vec::new();
        for (key, slot) in state.suggestions.iter().filter(|(k, _)| k.as_str() != current) {
            if cutoff.is_some_and(|c| slot.generated_at < c) {
                stale.push(key.clone());
            } else {
                survivors.push((key, slot.generated_at));
            }
        }

        let capacity = self.config.cache_max_entries.saturating_sub(1);
        if survivors.len() > capacity {
            survivors.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
            let excess = survivors.len() - capacity;
            stale.extend(survivors.into_iter().take(excess).map(|(k, _)| k.clone()));
        }

        if !stale.is_empty() {
            tracing::debug!(evicted = stale.len(), "pruning suggestion cache");
        }
        stale
    }
}

/// Generation timestamp strictly after every cached slot.
fn next_generation(state: &ProofState, now: DateTime<Utc>) -> DateTime<Utc> {
    match state.suggestions.values().map(|s| s.generated_at).max() {
        Some(newest) if newest >= now => newest + Duration::milliseconds(1),
        _ => now,
    }
}
