use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::adapters::llm::ModelProvider;
use crate::domain::models::config::{CombinerConfig, Config};
use crate::infrastructure::logging::RotationPolicy;

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".medscribe";

/// Prefix of environment variable overrides (`__` separates nested keys).
pub const ENV_PREFIX: &str = "MEDSCRIBE_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid target_confidence: {0}. Must be between 0 and 100")]
    InvalidTargetConfidence(f64),

    #[error("Invalid reviewer_weight: {0}. Must be between 0 and 1")]
    InvalidReviewerWeight(f64),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid max_attempts: {0}. Must be at least 1")]
    InvalidMaxAttempts(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .medscribe/config.yaml (project config, created by init)
    /// 3. .medscribe/local.yaml (project local overrides, optional)
    /// 4. Environment variables (MEDSCRIBE_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same as [`ConfigLoader::load`] with the config directory given explicitly.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let pipeline = &config.pipeline;

        let target = pipeline.target_confidence;
        if !(0.0..=100.0).contains(&target) {
            return Err(ConfigError::InvalidTargetConfidence(target));
        }

        if let CombinerConfig::Weighted { reviewer_weight } = pipeline.combiner {
            if !(0.0..=1.0).contains(&reviewer_weight) {
                return Err(ConfigError::InvalidReviewerWeight(reviewer_weight));
            }
        }

        if ModelProvider::from_str(&pipeline.model_selection.provider).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "unknown model provider '{}'",
                pipeline.model_selection.provider
            )));
        }

        if pipeline.model_selection.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }

        if pipeline.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(pipeline.retry.max_attempts));
        }

        if pipeline.retry.initial_backoff_ms >= pipeline.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                pipeline.retry.initial_backoff_ms,
                pipeline.retry.max_backoff_ms,
            ));
        }

        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if RotationPolicy::from_str(&config.logging.rotation).is_none() {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        let rps = config.rate_limit.requests_per_second;
        if rps.is_nan() || rps <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(config.rate_limit.requests_per_second));
        }

        if config.rate_limit.burst_size == 0 {
            return Err(ConfigError::InvalidBurstSize(config.rate_limit.burst_size));
        }

        if config.storage.output_dir.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "storage.output_dir cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
