//! Classify command.

use anyhow::Result;
use clap::Args;

use crate::cli::output::{output, CommandOutput};
use crate::services::classify;

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Error message to classify
    pub message: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ClassifyOutput {
    pub message: String,
    pub category: String,
}

impl CommandOutput for ClassifyOutput {
    fn to_human(&self) -> String {
        self.category.clone()
    }
}

pub fn execute(args: ClassifyArgs, json_mode: bool) -> Result<()> {
    let category = classify(&args.message);
    output(
        &ClassifyOutput {
            message: args.message,
            category: category.as_str().to_string(),
        },
        json_mode,
    );
    Ok(())
}
