//! Implementation of the `medscribe config` commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration after all layers are merged
    Show,
    /// Validate the effective configuration
    Validate,
}

#[derive(Debug, Serialize)]
pub struct ConfigShowOutput {
    #[serde(flatten)]
    pub config: Config,
    #[serde(skip)]
    pub yaml: String,
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        self.yaml.trim_end().to_string()
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigValidateOutput {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl CommandOutput for ConfigValidateOutput {
    fn to_human(&self) -> String {
        if self.valid {
            "Configuration is valid.".to_string()
        } else {
            let mut lines = vec!["Configuration is invalid:".to_string()];
            lines.extend(self.errors.iter().map(|e| format!("  - {e}")));
            lines.join("\n")
        }
    }
}

pub async fn execute(args: ConfigArgs, json_mode: bool) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = ConfigLoader::load()?;
            let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
            output(&ConfigShowOutput { config, yaml }, json_mode);
        }
        ConfigCommands::Validate => {
            let out = match ConfigLoader::load() {
                Ok(_) => ConfigValidateOutput {
                    valid: true,
                    errors: vec![],
                },
                Err(err) => ConfigValidateOutput {
                    valid: false,
                    errors: err.chain().map(ToString::to_string).collect(),
                },
            };
            output(&out, json_mode);
        }
    }
    Ok(())
}
