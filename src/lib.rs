//! medscribe - iterative clinical study report drafting
//!
//! A knowledge agent extracts study facts, a composer writes the first draft,
//! and reviewer and compliance agents score every draft until the combined
//! confidence reaches the target or the iteration budget runs out. Every
//! draft and report is kept as an immutable, numbered version.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, port traits and error types
//! - **Service Layer** (`services`): the convergence loop, run sessions and scoring
//! - **Adapters** (`adapters`): model providers, stores, renderers and event sinks
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use medscribe::adapters::agents::dry_run_agent_set;
//! use medscribe::adapters::memory::{InMemoryRunRepository, InMemoryVersionStore};
//! use medscribe::services::PipelineRunner;
//!
//! let runner = PipelineRunner::new(
//!     dry_run_agent_set(),
//!     Arc::new(InMemoryVersionStore::new()),
//!     Arc::new(InMemoryRunRepository::new()),
//! );
//! let completed = runner.run_to_completion(config.pipeline, input).await?;
//! println!("{}", completed.snapshot.status);
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Artifact, ArtifactKind, ClinicalInput, Config, Decision, IterationTrace, PipelineConfig,
    RunId, RunSnapshot, RunStatus, ScoreRecord,
};
pub use domain::ports::{AgentInvoker, AgentSet, RunRepository, VersionStore};
pub use domain::{DomainError, DomainResult, PipelineError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ConvergenceLoop, PipelineRunner, RunSession, ScoreAggregator};
