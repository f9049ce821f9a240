//! Command-line interface.

pub mod commands;
pub mod display;
pub mod output;

use clap::{Parser, Subcommand};
use console::style;

use commands::config::ConfigArgs;
use commands::init::InitArgs;
use commands::run::RunArgs;
use commands::runs::RunsArgs;
use commands::studies::StudiesArgs;

#[derive(Parser, Debug)]
#[command(name = "medscribe")]
#[command(about = "Iterative clinical study report drafting with reviewer feedback", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize medscribe configuration and database
    Init(InitArgs),
    /// Draft a report and iterate until it converges
    Run(RunArgs),
    /// Inspect recorded runs
    Runs(RunsArgs),
    /// Clinical trial data utilities
    Studies(StudiesArgs),
    /// Configuration commands
    Config(ConfigArgs),
}

/// Print an error in the requested format and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err}", style("Error:").red().bold());
        for cause in err.chain().skip(1) {
            eprintln!("  {} {cause}", style("caused by:").dim());
        }
    }
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from([
            "medscribe",
            "run",
            "--data",
            "study.json",
            "--template",
            "template.txt",
            "--target",
            "85",
            "--max-iterations",
            "4",
            "--dry-run",
            "--json",
        ]);
        assert!(cli.json);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.max_iterations, Some(4));
                assert_eq!(args.target, Some(85.0));
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
