//! Per-obligation attempt ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::models::{
    attempt_id, paths, AttemptInput, AttemptRecord, ErrorCategory, NodeHistory, Patch,
};

/// Rolling counters merged into a node history after each attempt.
///
/// Absent timestamps are skipped so a merge never clears the other side's
/// last-success or last-failure time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryCounters {
    current_streak: u32,
    total_attempts: u64,
    last_attempt_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_success_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_failure_at: Option<DateTime<Utc>>,
}

/// Build the attempt record for a validated input.
pub fn next_record(
    history: Option<&NodeHistory>,
    input: &AttemptInput,
    tactic_key: &str,
    now: DateTime<Utc>,
) -> AttemptRecord {
    let sequence = history.map_or(0, |h| h.total_attempts) + 1;
    AttemptRecord {
        id: attempt_id(&input.node_id, sequence),
        file_key: input.file_key.clone(),
        node_id: input.node_id.clone(),
        timestamp: now,
        tactic: input.tactic.trim().to_string(),
        tactic_key: tactic_key.to_string(),
        result: input.result,
        context_error_category: input.context_error_category,
        error_message: input.error_message.clone(),
        duration_ms: input.duration_ms,
    }
}

/// Patches appending `record` to its node's ledger and rolling the counters.
pub fn ledger_patches(history: Option<&NodeHistory>, record: &AttemptRecord) -> Vec<Patch> {
    let success = record.result.is_success();
    let previous_streak = history.map_or(0, |h| h.current_streak);

    let counters = HistoryCounters {
        current_streak: if success { 0 } else { previous_streak.saturating_add(1) },
        total_attempts: history.map_or(0, |h| h.total_attempts) + 1,
        last_attempt_at: record.timestamp,
        last_success_at: success.then_some(record.timestamp),
        last_failure_at: (!success).then_some(record.timestamp),
    };

    vec![
        Patch::set(
            paths::attempt(&record.file_key, &record.node_id, &record.id),
            record,
        ),
        Patch::merge(paths::node_history(&record.file_key, &record.node_id), &counters),
    ]
}

/// Local statistics of one tactic on one obligation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalStats {
    pub successes: u64,
    pub attempts: u64,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl LocalStats {
    fn observe(&mut self, record: &AttemptRecord) {
        self.attempts += 1;
        if record.result.is_success() {
            self.successes += 1;
        }
        self.last_attempt_at = Some(
            self.last_attempt_at
                .map_or(record.timestamp, |t| t.max(record.timestamp)),
        );
    }
}

/// Aggregate a node's ledger by `(category, tacticKey)`.
pub fn local_aggregates(history: &NodeHistory) -> BTreeMap<(ErrorCategory, String), LocalStats> {
    let mut stats: BTreeMap<(ErrorCategory, String), LocalStats> = BTreeMap::new();
    for record in history.attempts.values() {
        stats
            .entry((record.category_or_default(), record.tactic_key.clone()))
            .or_default()
            .observe(record);
    }
    stats
}
