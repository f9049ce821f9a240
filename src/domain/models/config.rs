use serde::{Deserialize, Serialize};

/// Main configuration structure for medscribe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Convergence loop settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Rate limiting for language model calls
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Where artifacts and run snapshots are kept
    #[serde(default)]
    pub storage: StorageConfig,

    /// Default input locations
    #[serde(default)]
    pub inputs: InputConfig,
}

/// Settings fixed for the lifetime of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Confidence (0-100) at which the loop stops as converged
    #[serde(default = "default_target_confidence")]
    pub target_confidence: f64,

    /// Upper bound on evaluation rounds
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// How reviewer and compliance scores are combined
    #[serde(default)]
    pub combiner: CombinerConfig,

    /// Which models back the agents
    #[serde(default)]
    pub model_selection: ModelSelection,

    /// Retry policy for evaluator and reviser calls
    #[serde(default)]
    pub retry: RetryConfig,
}

const fn default_target_confidence() -> f64 {
    80.0
}

const fn default_max_iterations() -> u32 {
    3
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_confidence: default_target_confidence(),
            max_iterations: default_max_iterations(),
            combiner: CombinerConfig::default(),
            model_selection: ModelSelection::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Score combination formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CombinerConfig {
    /// Arithmetic mean of both scores
    #[default]
    Mean,
    /// `w * reviewer + (1 - w) * compliance`
    Weighted { reviewer_weight: f64 },
    /// The lower of the two scores
    Min,
}

/// Provider and model names used by the agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelSelection {
    /// `openai`, `anthropic` or `scripted`
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model used for extraction, drafting, evaluation and revision
    #[serde(default = "default_worker_model")]
    pub worker_model: String,

    /// Model reserved for supervisory reasoning
    #[serde(default = "default_supervisor_model")]
    pub supervisor_model: String,

    /// Override for the provider's API base URL
    #[serde(default)]
    pub api_base: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_worker_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_supervisor_model() -> String {
    "gpt-4o".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            worker_model: default_worker_model(),
            supervisor_model: default_supervisor_model(),
            api_base: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts per agent call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    2000
}

const fn default_max_backoff_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".medscribe/medscribe.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation for file output: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
            retention_days: default_retention_days(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Requests per second allowed
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Burst size for token bucket
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

const fn default_requests_per_second() -> f64 {
    2.0
}

const fn default_burst_size() -> u32 {
    4
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Backend used for artifact versions and run snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Sqlite,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory rendered report files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    "data/output".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            output_dir: default_output_dir(),
        }
    }
}

/// Default input paths, overridable per `run` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InputConfig {
    #[serde(default)]
    pub data_path: Option<String>,
    #[serde(default)]
    pub template_path: Option<String>,
    #[serde(default)]
    pub sample_report_path: Option<String>,
}
