//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::commands::{
    classify::ClassifyArgs, derive::DeriveArgs, record::RecordArgs, suggest::SuggestArgs,
    sync::SyncArgs,
};

#[derive(Parser, Debug)]
#[command(name = "proofsync")]
#[command(about = "Proofsync - proof-state derivation and tactic suggestions", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// State file (overrides `state.path` from configuration)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Load configuration from this file instead of `.proofsync/`
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Derive goals and the dependency graph for a source file
    Derive(DeriveArgs),

    /// Record a tactic attempt against an obligation
    Record(RecordArgs),

    /// Rank tactics for an obligation
    Suggest(SuggestArgs),

    /// Run one scheduled sync for a source file
    Sync(SyncArgs),

    /// Classify an error message
    Classify(ClassifyArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "proofsync", "classify", "type mismatch", "--json", "--state", "/tmp/s.json",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.state, Some(PathBuf::from("/tmp/s.json")));
        assert!(matches!(cli.command, Commands::Classify(_)));
    }
}
