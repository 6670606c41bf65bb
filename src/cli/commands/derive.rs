//! Derive command: one synchronous derivation pass, committed to the state file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use serde_json::Value;

use crate::cli::commands::Workspace;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::diagnostic::{diagnostics_from_value, hints_from_value};
use crate::domain::models::{Goal, GraphNode};
use crate::domain::ports::{ContextLoader, GoalHintLoader, StateStore};
use crate::infrastructure::context::sidecar_list;
use crate::services::{derivation_patches, DerivationEngine};

#[derive(Args, Debug)]
pub struct DeriveArgs {
    /// Source file, relative to the working directory
    pub file: String,

    /// Diagnostics JSON (replaces the `<file>.diagnostics.json` sidecar)
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,

    /// Goal hints JSON (replaces the `<file>.goals.json` sidecar)
    #[arg(long)]
    pub hints: Option<PathBuf>,
}

#[derive(Debug, serde::Serialize)]
pub struct NodeOutput {
    pub node_id: String,
    pub label: String,
    pub kind: String,
    pub status: String,
    pub error_category: Option<String>,
    pub goal_id: Option<String>,
}

impl From<&GraphNode> for NodeOutput {
    fn from(node: &GraphNode) -> Self {
        Self {
            node_id: node.node_id.clone(),
            label: node.label.clone(),
            kind: node.kind.as_str().to_string(),
            status: node.status.as_str().to_string(),
            error_category: node.error_category.map(|c| c.as_str().to_string()),
            goal_id: node.goal_id.clone(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GoalOutput {
    pub id: String,
    pub status: String,
    pub statement: String,
}

impl From<&Goal> for GoalOutput {
    fn from(goal: &Goal) -> Self {
        Self {
            id: goal.id.clone(),
            status: goal.status.as_str().to_string(),
            statement: goal.statement.clone(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct DeriveOutput {
    pub file_key: String,
    pub root_status: String,
    pub nodes: Vec<NodeOutput>,
    pub goals: Vec<GoalOutput>,
    pub patches: usize,
}

impl CommandOutput for DeriveOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "{}: {} ({} node(s), {} goal(s))\n",
            self.file_key,
            self.root_status,
            self.nodes.len(),
            self.goals.len()
        )];
        lines.push(format!("{:<22} {:<11} {:<12} {:<18} {}", "NODE", "KIND", "STATUS", "CATEGORY", "LABEL"));
        lines.push("-".repeat(90));
        for node in &self.nodes {
            lines.push(format!(
                "{:<22} {:<11} {:<12} {:<18} {}",
                node.node_id,
                node.kind,
                node.status,
                node.error_category.as_deref().unwrap_or("-"),
                truncate(&node.label, 30)
            ));
        }
        lines.join("\n")
    }
}

async fn read_json(path: &Path) -> Result<Value> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

pub async fn execute(args: DeriveArgs, workspace: &Workspace, json_mode: bool) -> Result<()> {
    let mut context = workspace.loader.load_context(&args.file).await?;

    if let Some(path) = &args.diagnostics {
        let value = read_json(path).await?;
        context.diagnostics = diagnostics_from_value(sidecar_list(&value, "diagnostics"));
    }

    context.goal_hints = match &args.hints {
        Some(path) => hints_from_value(sidecar_list(&read_json(path).await?, "goalHints")),
        None => workspace.loader.load_hints(&args.file).await.unwrap_or_default(),
    };

    let derivation = DerivationEngine::new().derive(&context, Utc::now());

    let out = DeriveOutput {
        file_key: args.file.clone(),
        root_status: derivation
            .graph
            .root()
            .map(|root| root.status.as_str().to_string())
            .unwrap_or_default(),
        nodes: derivation
            .graph
            .nodes
            .values()
            .filter(|node| node.node_id != derivation.graph.root_id)
            .map(NodeOutput::from)
            .collect(),
        goals: derivation.goals.values().map(GoalOutput::from).collect(),
        patches: 0,
    };

    let patches = derivation_patches(&args.file, derivation);
    workspace.store.apply(&patches).await?;

    output(&DeriveOutput { patches: patches.len(), ..out }, json_mode);
    Ok(())
}
