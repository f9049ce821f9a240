//! medscribe CLI entry point.

use clap::Parser;
use tracing::{debug, warn};

use medscribe::cli::{commands, handle_error, Cli, Commands};
use medscribe::domain::models::LoggingConfig;
use medscribe::infrastructure::config::ConfigLoader;
use medscribe::infrastructure::logging::{cleanup_expired_logs, LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Invalid config is reported by the command itself; logging falls back to defaults.
    let logging = ConfigLoader::load().map_or_else(|_| LoggingConfig::default(), |c| c.logging);
    let log_config = LogConfig::from(&logging);
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    if let Some(log_dir) = &log_config.log_dir {
        match cleanup_expired_logs(log_dir, log_config.retention_days).await {
            Ok(removed) => debug!(removed, "expired log files removed"),
            Err(err) => warn!(error = %err, "log retention cleanup failed"),
        }
    }

    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, cli.json).await,
        Commands::Run(args) => commands::run::execute(args, cli.json).await,
        Commands::Runs(args) => commands::runs::execute(args, cli.json).await,
        Commands::Studies(args) => commands::studies::execute(args, cli.json).await,
        Commands::Config(args) => commands::config::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
