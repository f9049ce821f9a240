//! Run lifecycle: status, loop phases, failure reports and persisted snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::{AgentRole, KnowledgeInsights};
use super::artifact::{Artifact, RunId};
use super::config::PipelineConfig;
use super::score::ScoreRecord;
use super::trace::IterationTrace;

/// Status of a run. `Running` is the only non-terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Converged,
    MaxIterationsReached,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Converged => "converged",
            Self::MaxIterationsReached => "max_iterations_reached",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "converged" => Some(Self::Converged),
            "max_iterations_reached" => Some(Self::MaxIterationsReached),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of the convergence loop state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Extracting,
    Drafting,
    Evaluating,
    Deciding,
    Revising,
    Finalizing,
}

impl LoopPhase {
    /// Whether the loop may move from `self` to `next`.
    ///
    /// Any non-final phase may jump to `Finalizing` (failure or cancellation).
    pub fn can_transition_to(&self, next: LoopPhase) -> bool {
        use LoopPhase::{Deciding, Drafting, Evaluating, Extracting, Finalizing, Revising};

        match (self, next) {
            (Finalizing, _) => false,
            (_, Finalizing) => true,
            (Extracting, Drafting)
            | (Drafting, Evaluating)
            | (Evaluating, Deciding)
            | (Deciding, Revising)
            | (Revising, Evaluating) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracting => "extracting",
            Self::Drafting => "drafting",
            Self::Evaluating => "evaluating",
            Self::Deciding => "deciding",
            Self::Revising => "revising",
            Self::Finalizing => "finalizing",
        }
    }
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Phase the loop was in when it failed.
    pub phase: LoopPhase,
    pub iteration: Option<u32>,
    pub agent: Option<AgentRole>,
    /// Operator-readable cause.
    pub reason: String,
    /// Last score record computed before the failure, if any.
    pub last_score: Option<ScoreRecord>,
}

/// Latest artifacts of a run at the time it was sealed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalArtifacts {
    pub draft: Option<Artifact>,
    pub last_review: Option<Artifact>,
    pub last_compliance: Option<Artifact>,
}

/// Serializable view of a run session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: RunId,
    pub config: PipelineConfig,
    pub status: RunStatus,
    pub phase: LoopPhase,
    pub insights: Option<KnowledgeInsights>,
    pub trace: IterationTrace,
    pub final_artifacts: FinalArtifacts,
    pub failure: Option<FailureReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSnapshot {
    /// Study id from the extracted insights, or `TBD`.
    pub fn study_id(&self) -> &str {
        self.insights
            .as_ref()
            .map_or(KnowledgeInsights::UNKNOWN_STUDY, KnowledgeInsights::study_id_or_unknown)
    }

    /// Wall-clock duration of the run, if it has finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    pub fn final_draft_version(&self) -> Option<u32> {
        self.final_artifacts.draft.as_ref().map(|a| a.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_transitions() {
        assert!(LoopPhase::Extracting.can_transition_to(LoopPhase::Drafting));
        assert!(LoopPhase::Deciding.can_transition_to(LoopPhase::Revising));
        assert!(LoopPhase::Revising.can_transition_to(LoopPhase::Evaluating));
        assert!(LoopPhase::Evaluating.can_transition_to(LoopPhase::Finalizing));

        assert!(!LoopPhase::Extracting.can_transition_to(LoopPhase::Evaluating));
        assert!(!LoopPhase::Deciding.can_transition_to(LoopPhase::Evaluating));
        assert!(!LoopPhase::Finalizing.can_transition_to(LoopPhase::Finalizing));
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            RunStatus::Running,
            RunStatus::Converged,
            RunStatus::MaxIterationsReached,
            RunStatus::Failed,
            RunStatus::Cancelled,
        ] {
            assert_eq!(RunStatus::from_str(status.as_str()), Some(status));
        }
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
    }
}
