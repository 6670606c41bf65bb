//! Record command.

use anyhow::{anyhow, Result};
use clap::Args;

use crate::cli::commands::Workspace;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{AttemptInput, AttemptResult, ErrorCategory, NodeHistory};
use crate::domain::ports::StateStore;

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Source file key
    #[arg(long)]
    pub file: String,

    /// Graph node id of the obligation
    #[arg(long)]
    pub node: String,

    /// Tactic text as written
    #[arg(long)]
    pub tactic: String,

    /// Tactic key (defaults to the tactic's head token)
    #[arg(long)]
    pub key: Option<String>,

    /// Outcome (success, error, timeout, placeholder)
    #[arg(long)]
    pub result: String,

    /// Error category at the time of the attempt
    #[arg(long)]
    pub category: Option<String>,

    /// Error message reported for the attempt
    #[arg(long)]
    pub message: Option<String>,

    /// Attempt duration in milliseconds
    #[arg(long)]
    pub duration_ms: Option<u64>,

    /// Goal text the tactic was applied to
    #[arg(long)]
    pub goal: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct RecordOutput {
    pub recorded: bool,
    pub attempt_id: Option<String>,
    pub tactic_key: Option<String>,
    pub total_attempts: u64,
    pub current_streak: u32,
    pub patches: usize,
}

impl CommandOutput for RecordOutput {
    fn to_human(&self) -> String {
        match &self.attempt_id {
            Some(id) if self.recorded => format!(
                "Recorded {} ({}); {} attempt(s), failure streak {}",
                id,
                self.tactic_key.as_deref().unwrap_or("-"),
                self.total_attempts,
                self.current_streak
            ),
            _ => "Nothing recorded: attempt input was incomplete.".to_string(),
        }
    }
}

pub async fn execute(args: RecordArgs, workspace: &Workspace, json_mode: bool) -> Result<()> {
    let result = AttemptResult::from_str(&args.result)
        .ok_or_else(|| anyhow!("Invalid result: {}", args.result))?;
    let category = args
        .category
        .as_deref()
        .map(|c| ErrorCategory::from_str(c).ok_or_else(|| anyhow!("Invalid category: {c}")))
        .transpose()?;

    let input = AttemptInput {
        tactic_key: args.key,
        context_error_category: category,
        error_message: args.message,
        duration_ms: args.duration_ms,
        goal_text: args.goal,
        ..AttemptInput::new(&args.file, &args.node, &args.tactic, result)
    };

    let patches = workspace.session().record_attempt(&input).await?;

    let state = workspace.store.snapshot().await?;
    let history = state.node_history(&args.file, &args.node);
    let latest = history.and_then(NodeHistory::latest);

    let out = RecordOutput {
        recorded: !patches.is_empty(),
        attempt_id: latest.map(|r| r.id.clone()),
        tactic_key: latest.map(|r| r.tactic_key.clone()),
        total_attempts: history.map_or(0, |h| h.total_attempts),
        current_streak: history.map_or(0, |h| h.current_streak),
        patches: patches.len(),
    };
    output(&out, json_mode);
    Ok(())
}
