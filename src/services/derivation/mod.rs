//! Proof-state derivation.
//!
//! Turns a source snapshot plus compiler diagnostics into goal records and
//! a dependency graph. Every pass recomputes everything from scratch; goal
//! ids are the only continuity between passes.

pub mod identity;
pub mod scanner;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::{
    paths, Declaration, DependencyGraph, DerivationContext, Diagnostic, Goal, GoalStatus,
    GraphNode, NodeKind, NodeStatus, Patch, SourceRange,
};
use crate::services::error_classifier::classify;
use crate::services::goal_signature::{collapse_whitespace, normalize_statement, strip_comments};

use identity::{DeclarationIdentity, DiagnosticIdentity};
use scanner::ScannedBlock;

const DIAGNOSTIC_LABEL_MAX: usize = 60;

/// Result of one derivation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Derivation {
    pub goals: BTreeMap<String, Goal>,
    pub graph: DependencyGraph,
    pub declarations: Vec<Declaration>,
    pub derived_at: DateTime<Utc>,
}

impl Derivation {
    fn empty(file_key: &str, now: DateTime<Utc>) -> Self {
        Self {
            goals: BTreeMap::new(),
            graph: DependencyGraph::empty(file_key),
            declarations: Vec::new(),
            derived_at: now,
        }
    }
}

/// Stateless derivation engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerivationEngine;

impl DerivationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Derive goals and the dependency graph. Never fails: a blank source
    /// yields a graph holding only the root.
    pub fn derive(&self, context: &DerivationContext, now: DateTime<Utc>) -> Derivation {
        let mut derivation = Derivation::empty(&context.file_key, now);
        if context.source_text.trim().is_empty() {
            return derivation;
        }

        let stripped = strip_comments(&context.source_text);
        let blocks = scanner::scan(&stripped);

        let mut diagnostics: Vec<&Diagnostic> = context.diagnostics.iter().collect();
        diagnostics.sort_by_key(|d| d.range.start);

        for block in &blocks {
            let (goal, node) = self.derive_block(block, &diagnostics, context);
            if let Some(goal) = goal {
                derivation.goals.insert(goal.id.clone(), goal);
            }
            derivation.graph.attach_to_root(node);
        }

        for diagnostic in diagnostics.iter().filter(|d| d.severity.is_error()) {
            let covered = blocks
                .iter()
                .any(|b| b.declaration.contains_line(diagnostic.line()));
            if covered {
                continue;
            }
            let (goal, node) = standalone_diagnostic(diagnostic);
            derivation.goals.insert(goal.id.clone(), goal);
            derivation.graph.attach_to_root(node);
        }

        derivation.graph.refresh_root_status();
        derivation.declarations = blocks.into_iter().map(|b| b.declaration).collect();

        tracing::debug!(
            file_key = %context.file_key,
            declarations = derivation.declarations.len(),
            goals = derivation.goals.len(),
            nodes = derivation.graph.nodes.len(),
            root_status = derivation.graph.root().map_or("missing", |r| r.status.as_str()),
            "derived proof state"
        );

        derivation
    }

    fn derive_block(
        &self,
        block: &ScannedBlock,
        sorted_diagnostics: &[&Diagnostic],
        context: &DerivationContext,
    ) -> (Option<Goal>, GraphNode) {
        let decl = &block.declaration;

        let identity_key = decl
            .statement
            .clone()
            .unwrap_or_else(|| format!("{} {}", decl.kind.as_str(), decl.label));
        let identity = DeclarationIdentity::new(decl.start_line, &identity_key);

        let first_error = sorted_diagnostics
            .iter()
            .find(|d| d.severity.is_error() && decl.contains_line(d.line()));

        let status = if first_error.is_some() {
            NodeStatus::Error
        } else if block.has_sorry() {
            NodeStatus::Sorry
        } else if !decl.has_body {
            NodeStatus::InProgress
        } else {
            NodeStatus::Resolved
        };

        let goal = decl.is_proof.then(|| Goal {
            id: identity.goal_id(),
            statement: decl.statement.clone().unwrap_or_default(),
            status: goal_status(status),
            goal_text: context
                .goal_hints
                .iter()
                .filter(|h| decl.contains_line(h.line))
                .max_by_key(|h| h.line)
                .map(|h| h.goal_text.clone()),
        });

        let node = GraphNode {
            node_id: identity.node_id(),
            label: decl.label.clone(),
            kind: NodeKind::from(decl.kind),
            range: SourceRange::lines(decl.start_line, decl.end_line),
            parent_id: None,
            status,
            error_message: first_error.map(|d| d.message.clone()),
            error_category: first_error.map(|d| classify(&d.message)),
            goal_id: goal.as_ref().map(|g| g.id.clone()),
        };

        (goal, node)
    }
}

fn goal_status(status: NodeStatus) -> GoalStatus {
    match status {
        NodeStatus::Error => GoalStatus::Failed,
        NodeStatus::Sorry | NodeStatus::InProgress => GoalStatus::Open,
        NodeStatus::Resolved => GoalStatus::Resolved,
    }
}

fn standalone_diagnostic(diagnostic: &Diagnostic) -> (Goal, GraphNode) {
    let normalized = normalize_statement(&diagnostic.message);
    let identity = DiagnosticIdentity::new(diagnostic.line(), &normalized);

    let goal = Goal {
        id: identity.goal_id(),
        statement: normalized,
        status: GoalStatus::Failed,
        goal_text: None,
    };

    let first_line = collapse_whitespace(diagnostic.message.lines().next().unwrap_or_default());
    let label = if first_line.chars().count() > DIAGNOSTIC_LABEL_MAX {
        let truncated: String = first_line.chars().take(DIAGNOSTIC_LABEL_MAX - 3).collect();
        format!("{truncated}...")
    } else {
        first_line
    };

    let node = GraphNode {
        node_id: identity.node_id(),
        label,
        kind: NodeKind::Diagnostic,
        range: Some(diagnostic.range),
        parent_id: None,
        status: NodeStatus::Error,
        error_message: Some(diagnostic.message.clone()),
        error_category: Some(classify(&diagnostic.message)),
        goal_id: Some(goal.id.clone()),
    };

    (goal, node)
}

/// Patches committing a derivation for `file_key`.
///
/// The graph is validated first; an inconsistent graph keeps the previous
/// goals and graph and only bumps the last-synced timestamp.
pub fn derivation_patches(file_key: &str, derivation: Derivation) -> Vec<Patch> {
    let now = derivation.derived_at;
    match derivation.graph.validated() {
        Some(graph) => vec![
            Patch::set(paths::file_goals(file_key), &derivation.goals),
            Patch::set(paths::file_graph(file_key), &graph),
            Patch::set(paths::file_last_synced(file_key), &now),
        ],
        None => {
            tracing::warn!(file_key, "derivation produced an inconsistent graph; keeping previous state");
            last_synced_patches(file_key, now)
        }
    }
}

/// Patches for a sync that produced no context.
pub fn last_synced_patches(file_key: &str, now: DateTime<Utc>) -> Vec<Patch> {
    vec![Patch::set(paths::file_last_synced(file_key), &now)]
}
