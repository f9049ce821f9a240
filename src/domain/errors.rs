//! Domain errors for the medscribe pipeline.
//!
//! Two families live here:
//!
//! - [`DomainError`] -- storage and bookkeeping failures raised by the
//!   version store and run repository adapters.
//! - [`PipelineError`] -- the run-level taxonomy surfaced by the convergence
//!   loop. Every variant renders as a sentence an operator can act on.

use thiserror::Error;

use super::models::{AgentRole, ArtifactKind, LoopPhase, RunId};
use super::ports::GenerationError;

/// Storage-level errors raised by ports and adapters.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Run not found: {0}")]
    RunNotFound(RunId),

    #[error("Artifact not found: run {run_id} {kind} v{version}")]
    ArtifactNotFound {
        run_id: RunId,
        kind: ArtifactKind,
        version: u32,
    },

    #[error("Version conflict for run {run_id} {kind}: expected v{expected}, got v{got}")]
    VersionConflict {
        run_id: RunId,
        kind: ArtifactKind,
        expected: u32,
        got: u32,
    },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

/// Run-level errors produced by the convergence loop.
///
/// `KnowledgeExtraction` and `DraftGeneration` are fatal on first failure.
/// `Evaluation` and `Revision` are only raised once the bounded retry
/// policy has been exhausted for the single failing agent.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Knowledge extraction failed: {source}")]
    KnowledgeExtraction {
        #[source]
        source: GenerationError,
    },

    #[error("Initial draft generation failed: {source}")]
    DraftGeneration {
        #[source]
        source: GenerationError,
    },

    #[error("{agent} evaluation failed at iteration {iteration} after {attempts} attempt(s): {source}")]
    Evaluation {
        iteration: u32,
        agent: AgentRole,
        attempts: u32,
        #[source]
        source: GenerationError,
    },

    #[error("Revision failed at iteration {iteration} after {attempts} attempt(s): {source}")]
    Revision {
        iteration: u32,
        attempts: u32,
        #[source]
        source: GenerationError,
    },

    #[error("Storage failure during {phase}: {source}")]
    Store {
        phase: LoopPhase,
        #[source]
        source: DomainError,
    },

    #[error("Run {0} is sealed and accepts no further writes")]
    SessionSealed(RunId),

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: LoopPhase, to: LoopPhase },
}

impl PipelineError {
    /// The agent whose failure ended the run, if one did.
    pub fn agent(&self) -> Option<AgentRole> {
        match self {
            Self::KnowledgeExtraction { .. } => Some(AgentRole::Knowledge),
            Self::DraftGeneration { .. } => Some(AgentRole::Composer),
            Self::Evaluation { agent, .. } => Some(*agent),
            Self::Revision { .. } => Some(AgentRole::Reviser),
            Self::Store { .. } | Self::SessionSealed(_) | Self::InvalidTransition { .. } => None,
        }
    }

    /// The loop iteration the failure belongs to, if any.
    pub fn iteration(&self) -> Option<u32> {
        match self {
            Self::Evaluation { iteration, .. } | Self::Revision { iteration, .. } => {
                Some(*iteration)
            }
            _ => None,
        }
    }
}
