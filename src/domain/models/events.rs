//! Structured progress events emitted while a run executes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::AgentRole;
use super::artifact::{ArtifactKind, RunId};
use super::score::{Decision, ScoreRecord};
use super::session::{LoopPhase, RunStatus};

/// A pipeline event with the run it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub run_id: RunId,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl PipelineEvent {
    pub fn new(run_id: RunId, payload: EventPayload) -> Self {
        Self {
            run_id,
            timestamp: Utc::now(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventPayload {
    RunStarted {
        target_confidence: f64,
        max_iterations: u32,
    },
    PhaseChanged {
        from: LoopPhase,
        to: LoopPhase,
    },
    IterationStarted {
        iteration: u32,
        draft_version: u32,
    },
    AgentRetry {
        agent: AgentRole,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    ArtifactStored {
        kind: ArtifactKind,
        version: u32,
    },
    ScoreComputed {
        score: ScoreRecord,
    },
    DecisionTaken {
        iteration: u32,
        decision: Decision,
    },
    IterationFinished {
        iteration: u32,
    },
    RunFinished {
        status: RunStatus,
        final_draft_version: Option<u32>,
    },
}

impl EventPayload {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::PhaseChanged { .. } => "phase_changed",
            Self::IterationStarted { .. } => "iteration_started",
            Self::AgentRetry { .. } => "agent_retry",
            Self::ArtifactStored { .. } => "artifact_stored",
            Self::ScoreComputed { .. } => "score_computed",
            Self::DecisionTaken { .. } => "decision_taken",
            Self::IterationFinished { .. } => "iteration_finished",
            Self::RunFinished { .. } => "run_finished",
        }
    }
}
