//! Suggest command.

use anyhow::{bail, Result};
use clap::Args;

use crate::cli::commands::Workspace;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::SuggestionEntry;

#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// Source file key
    #[arg(long)]
    pub file: String,

    /// Graph node id of the obligation
    #[arg(long)]
    pub node: String,

    /// Maximum number of suggestions (defaults to `ranking.limit`)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, serde::Serialize)]
pub struct SuggestOutput {
    pub file_key: String,
    pub node_id: String,
    pub suggestions: Vec<SuggestionEntry>,
}

impl CommandOutput for SuggestOutput {
    fn to_human(&self) -> String {
        if self.suggestions.is_empty() {
            return format!("No suggestions for {}#{}.", self.file_key, self.node_id);
        }

        let mut lines = vec![format!("{} suggestion(s) for {}#{}:\n", self.suggestions.len(), self.file_key, self.node_id)];
        lines.push(format!("{:<4} {:<20} {:>7} {:>8} {:>7}  {}", "#", "TACTIC", "SCORE", "SAMPLES", "RATE", "CATEGORY"));
        lines.push("-".repeat(70));
        for (rank, entry) in self.suggestions.iter().enumerate() {
            lines.push(format!(
                "{:<4} {:<20} {:>7.3} {:>8} {:>6.0}%  {}",
                rank + 1,
                entry.tactic_key,
                entry.score,
                entry.sample_size,
                entry.success_rate * 100.0,
                entry.source_category.map_or("-", |c| c.as_str())
            ));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: SuggestArgs, workspace: &Workspace, json_mode: bool) -> Result<()> {
    let suggestions = match args.limit {
        Some(0) => bail!("--limit must be at least 1"),
        Some(limit) => {
            let mut config = workspace.config.clone();
            config.ranking.limit = limit;
            Workspace { config, store: workspace.store.clone(), loader: workspace.loader.clone() }
                .session()
                .suggest(&args.file, &args.node)
                .await?
        }
        None => workspace.session().suggest(&args.file, &args.node).await?,
    };

    output(
        &SuggestOutput {
            file_key: args.file,
            node_id: args.node,
            suggestions,
        },
        json_mode,
    );
    Ok(())
}
