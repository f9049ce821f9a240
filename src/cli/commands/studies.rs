//! Implementation of the `medscribe studies` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::output::{output, CommandOutput};
use crate::services::{split_studies, SplitSummary};

#[derive(Args, Debug)]
pub struct StudiesArgs {
    #[command(subcommand)]
    pub command: StudiesCommands,
}

#[derive(Subcommand, Debug)]
pub enum StudiesCommands {
    /// Split combined ClinicalTrials.gov exports into one file per study
    Split {
        /// Export file or directory of exports
        input: PathBuf,
        /// Directory the per-study files are written to
        #[arg(long, short, default_value = "data/input")]
        output: PathBuf,
    },
}

impl CommandOutput for SplitSummary {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Processed {} file(s): {} studies written, {} skipped",
            self.files_processed, self.studies_written, self.studies_skipped
        )];
        for path in &self.written {
            lines.push(format!("  - {}", path.display()));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: StudiesArgs, json_mode: bool) -> Result<()> {
    match args.command {
        StudiesCommands::Split { input, output: output_dir } => {
            let summary = split_studies(&input, &output_dir)
                .await
                .with_context(|| format!("Failed to split studies from {}", input.display()))?;
            output(&summary, json_mode);
        }
    }
    Ok(())
}
