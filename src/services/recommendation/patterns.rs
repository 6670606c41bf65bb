//! Global `category:tacticKey` pattern table.

use chrono::{DateTime, Utc};

use crate::domain::models::{paths, pattern_key, AttemptRecord, Patch, PatternEntry, ProofState};

/// Fold one attempt into its pattern entry.
///
/// A successful attempt also stamps the entry with the signature of the
/// goal it closed, when one is known.
pub fn observe_attempt(
    state: &ProofState,
    record: &AttemptRecord,
    goal_signature: Option<String>,
    now: DateTime<Utc>,
) -> PatternEntry {
    let category = record.category_or_default();
    let key = pattern_key(category, &record.tactic_key);

    let mut entry = state
        .patterns
        .get(&key)
        .cloned()
        .unwrap_or_else(|| PatternEntry::new(category, &record.tactic_key, now));

    let success = record.result.is_success();
    entry.observe(success, now);
    if success {
        if let Some(signature) = goal_signature {
            entry.goal_signature = Some(signature);
        }
    }
    entry
}

pub fn pattern_patch(entry: &PatternEntry) -> Patch {
    Patch::set(paths::pattern(&entry.key), entry)
}
