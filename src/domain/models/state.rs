//! Typed snapshot of the externally-owned state tree.
//!
//! Layout:
//!
//! ```text
//! files/<fileKey>/{goals, graph, lastSyncedAt}
//! history/<fileKey>/<nodeId>        NodeHistory
//! patterns/<category>:<tacticKey>   PatternEntry
//! suggestions/<fileKey>#<nodeId>    SuggestionSlot
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::attempt::{suggestion_slot_key, NodeHistory, PatternEntry, SuggestionSlot};
use super::goal::Goal;
use super::graph::{DependencyGraph, GraphNode};

/// Derived state for one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileState {
    #[serde(default)]
    pub goals: BTreeMap<String, Goal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<DependencyGraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Immutable view the engines read from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProofState {
    #[serde(default)]
    pub files: BTreeMap<String, FileState>,
    #[serde(default)]
    pub history: BTreeMap<String, BTreeMap<String, NodeHistory>>,
    #[serde(default)]
    pub patterns: BTreeMap<String, PatternEntry>,
    #[serde(default)]
    pub suggestions: BTreeMap<String, SuggestionSlot>,
}

impl ProofState {
    /// Deserialize a snapshot from the raw tree.
    ///
    /// Sections that fail to parse are treated as empty rather than
    /// poisoning the whole snapshot.
    pub fn from_value(value: &Value) -> Self {
        fn section<T: serde::de::DeserializeOwned + Default>(value: &Value, key: &str) -> T {
            match value.get(key) {
                None | Some(Value::Null) => T::default(),
                Some(raw) => serde_json::from_value(raw.clone()).unwrap_or_else(|err| {
                    tracing::warn!(section = key, error = %err, "state section failed to parse");
                    T::default()
                }),
            }
        }

        Self {
            files: section(value, "files"),
            history: section(value, "history"),
            patterns: section(value, "patterns"),
            suggestions: section(value, "suggestions"),
        }
    }

    pub fn file(&self, file_key: &str) -> Option<&FileState> {
        self.files.get(file_key)
    }

    pub fn node(&self, file_key: &str, node_id: &str) -> Option<&GraphNode> {
        self.file(file_key)?.graph.as_ref()?.node(node_id)
    }

    /// The goal attached to a graph node, if any.
    pub fn goal_for_node(&self, file_key: &str, node_id: &str) -> Option<&Goal> {
        let goal_id = self.node(file_key, node_id)?.goal_id.as_deref()?;
        self.file(file_key)?.goals.get(goal_id)
    }

    pub fn node_history(&self, file_key: &str, node_id: &str) -> Option<&NodeHistory> {
        self.history.get(file_key)?.get(node_id)
    }

    pub fn suggestion_slot(&self, file_key: &str, node_id: &str) -> Option<&SuggestionSlot> {
        self.suggestions.get(&suggestion_slot_key(file_key, node_id))
    }
}

/// Path builders for the state tree.
pub mod paths {
    fn owned(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| (*s).to_string()).collect()
    }

    pub fn file_goals(file_key: &str) -> Vec<String> {
        owned(&["files", file_key, "goals"])
    }

    pub fn file_graph(file_key: &str) -> Vec<String> {
        owned(&["files", file_key, "graph"])
    }

    /// `files.<file>.lastSyncedAt`
    pub fn file_last_synced(file_key: &str) -> Vec<String> {
        owned(&["files", file_key, "lastSyncedAt"])
    }

    pub fn node_history(file_key: &str, node_id: &str) -> Vec<String> {
        owned(&["history", file_key, node_id])
    }

    /// One ledger record under a node's history.
    pub fn attempt(file_key: &str, node_id: &str, attempt_id: &str) -> Vec<String> {
        owned(&["history", file_key, node_id, "attempts", attempt_id])
    }

    pub fn pattern(key: &str) -> Vec<String> {
        owned(&["patterns", key])
    }

    pub fn suggestion_slot(slot_key: &str) -> Vec<String> {
        owned(&["suggestions", slot_key])
    }
}
