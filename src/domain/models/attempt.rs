//! Tactic attempt ledger, pattern statistics, and suggestion models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error_category::ErrorCategory;

/// Outcome reported by the tactic executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptResult {
    Success,
    Error,
    Timeout,
    /// Tactic closed the goal with a placeholder such as `sorry`
    Placeholder,
}

impl AttemptResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Timeout => "timeout",
            Self::Placeholder => "placeholder",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "success" | "ok" => Some(Self::Success),
            "error" | "failure" | "failed" => Some(Self::Error),
            "timeout" => Some(Self::Timeout),
            "placeholder" | "sorry" => Some(Self::Placeholder),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Derive the ranking key of a tactic: its head token, lowercased, with
/// trailing punctuation and config brackets removed.
///
/// `simp only [foo]` and `Simp` both map to `simp`; `exact?` keeps its `?`.
pub fn tactic_key(tactic: &str) -> Option<String> {
    let head = tactic
        .split(|c: char| c.is_whitespace() || c == '[' || c == '(' || c == ';' || c == '<')
        .find(|s| !s.is_empty())?;
    let key = head.trim_end_matches([',', '.']).to_lowercase();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Key of a global pattern entry: `category:tacticKey`.
pub fn pattern_key(category: ErrorCategory, tactic_key: &str) -> String {
    format!("{}:{}", category.as_str(), tactic_key)
}

/// One recorded tactic attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub id: String,
    pub file_key: String,
    pub node_id: String,
    pub timestamp: DateTime<Utc>,
    pub tactic: String,
    pub tactic_key: String,
    pub result: AttemptResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_error_category: Option<ErrorCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl AttemptRecord {
    /// Category used for pattern keys when the attempt carried none.
    pub fn category_or_default(&self) -> ErrorCategory {
        self.context_error_category.unwrap_or_default()
    }
}

/// Attempt id: node id plus a zero-padded per-node sequence number.
pub fn attempt_id(node_id: &str, sequence: u64) -> String {
    format!("{node_id}#{sequence:06}")
}

/// Per-obligation attempt history with rolling counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeHistory {
    #[serde(default)]
    pub attempts: BTreeMap<String, AttemptRecord>,
    /// Consecutive non-success attempts since the last success.
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub total_attempts: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl NodeHistory {
    /// The most recent attempt by timestamp, ties broken by id.
    pub fn latest(&self) -> Option<&AttemptRecord> {
        self.attempts
            .values()
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)))
    }
}

/// Aggregated success/failure statistics for one `category:tacticKey` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternEntry {
    pub key: String,
    pub category: ErrorCategory,
    pub tactic_key: String,
    pub success_count: u64,
    pub failure_count: u64,
    pub score: f64,
    pub last_updated: DateTime<Utc>,
    /// Signature of the goal most recently closed by this pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_signature: Option<String>,
}

impl PatternEntry {
    pub fn new(category: ErrorCategory, tactic_key: &str, now: DateTime<Utc>) -> Self {
        Self {
            key: pattern_key(category, tactic_key),
            category,
            tactic_key: tactic_key.to_string(),
            success_count: 0,
            failure_count: 0,
            score: 0.0,
            last_updated: now,
            goal_signature: None,
        }
    }

    pub fn sample_size(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Count one outcome and recompute the score.
    pub fn observe(&mut self, success: bool, now: DateTime<Utc>) {
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.score = success_rate(self.success_count, self.sample_size());
        self.last_updated = now;
    }
}

/// `successes / total`, or 0 when there is no data.
#[allow(clippy::cast_precision_loss)]
pub fn success_rate(successes: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        successes as f64 / total as f64
    }
}

/// One ranked tactic suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionEntry {
    pub node_id: String,
    pub tactic_key: String,
    /// Blended score in `[0, 1]`
    pub score: f64,
    pub sample_size: u64,
    pub success_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_category: Option<ErrorCategory>,
    pub generated_at: DateTime<Utc>,
}

/// Cached suggestion list for one obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionSlot {
    pub file_key: String,
    pub node_id: String,
    pub entries: Vec<SuggestionEntry>,
    pub generated_at: DateTime<Utc>,
}

/// Cache slot key for one obligation.
pub fn suggestion_slot_key(file_key: &str, node_id: &str) -> String {
    format!("{file_key}#{node_id}")
}

/// Attempt as submitted by a caller, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptInput {
    #[serde(default)]
    pub file_key: String,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub tactic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tactic_key: Option<String>,
    pub result: AttemptResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_error_category: Option<ErrorCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Goal text at the time of the attempt, if the caller knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_text: Option<String>,
}

impl Default for AttemptResult {
    fn default() -> Self {
        Self::Error
    }
}

impl AttemptInput {
    pub fn new(
        file_key: impl Into<String>,
        node_id: impl Into<String>,
        tactic: impl Into<String>,
        result: AttemptResult,
    ) -> Self {
        Self {
            file_key: file_key.into(),
            node_id: node_id.into(),
            tactic: tactic.into(),
            result,
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.context_error_category = Some(category);
        self
    }

    /// Resolved tactic key, or `None` when the input is malformed.
    pub fn resolved_tactic_key(&self) -> Option<String> {
        if self.file_key.trim().is_empty()
            || self.node_id.trim().is_empty()
            || self.tactic.trim().is_empty()
        {
            return None;
        }
        match self.tactic_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Some(key.to_lowercase()),
            _ => tactic_key(&self.tactic),
        }
    }
}
