//! Proofsync CLI entry point.

use anyhow::Result;
use clap::Parser;

use proofsync::cli::commands::{self, Workspace};
use proofsync::cli::{handle_error, Cli, Commands};
use proofsync::infrastructure::config::ConfigLoader;
use proofsync::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json_mode);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    // Held until exit so buffered file logs are flushed
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    let json = cli.json;
    let workspace = Workspace::open(config, cli.state);

    match cli.command {
        Commands::Derive(args) => commands::derive::execute(args, &workspace, json).await,
        Commands::Record(args) => commands::record::execute(args, &workspace, json).await,
        Commands::Suggest(args) => commands::suggest::execute(args, &workspace, json).await,
        Commands::Sync(args) => commands::sync::execute(args, &workspace, json).await,
        Commands::Classify(args) => commands::classify::execute(args, json),
    }
}
