//! Sync command: drive one debounced sync through the scheduler.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::Args;

use crate::cli::commands::Workspace;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{GoalStatus, SyncReason};
use crate::domain::ports::StateStore;
use crate::services::ScheduleOptions;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Source file, relative to the working directory
    pub file: String,

    /// Trigger reason (startup, activate, save, diagnostics, apply)
    #[arg(long, default_value = "save")]
    pub reason: String,

    /// Override the reason's debounce delay
    #[arg(long)]
    pub debounce_ms: Option<i64>,
}

#[derive(Debug, serde::Serialize)]
pub struct SyncOutput {
    pub file_key: String,
    pub reason: String,
    pub goals: usize,
    pub open_goals: usize,
    pub root_status: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl CommandOutput for SyncOutput {
    fn to_human(&self) -> String {
        match self.last_synced_at {
            Some(at) => format!(
                "Synced {} ({}) at {}: {} goal(s), {} open, root {}",
                self.file_key,
                self.reason,
                at.to_rfc3339(),
                self.goals,
                self.open_goals,
                self.root_status.as_deref().unwrap_or("unknown")
            ),
            None => format!("{} has not been synced.", self.file_key),
        }
    }
}

pub async fn execute(args: SyncArgs, workspace: &Workspace, json_mode: bool) -> Result<()> {
    let reason = SyncReason::from_str(&args.reason)
        .ok_or_else(|| anyhow!("Invalid reason: {}", args.reason))?;

    let mut options = ScheduleOptions::default();
    if let Some(ms) = args.debounce_ms {
        options = options.debounce_ms(ms);
    }

    let session = workspace.session();
    session.schedule_sync_with(&args.file, reason, options).await;
    session.shutdown();

    let state = workspace.store.snapshot().await?;
    let file = state.file(&args.file);

    let out = SyncOutput {
        file_key: args.file.clone(),
        reason: reason.as_str().to_string(),
        goals: file.map_or(0, |f| f.goals.len()),
        open_goals: file.map_or(0, |f| f.goals.values().filter(|g| g.status == GoalStatus::Open).count()),
        root_status: file
            .and_then(|f| f.graph.as_ref())
            .and_then(|g| g.root())
            .map(|root| root.status.as_str().to_string()),
        last_synced_at: file.and_then(|f| f.last_synced_at),
    };
    output(&out, json_mode);
    Ok(())
}
