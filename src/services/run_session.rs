//! Run session handle: the observable state of one pipeline execution.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::errors::PipelineError;
use crate::domain::models::{
    Artifact, ArtifactKind, FailureReport, FinalArtifacts, IterationEntry, IterationTrace,
    KnowledgeInsights, LoopPhase, PipelineConfig, RunId, RunSnapshot, RunStatus,
};

#[derive(Debug)]
struct SessionState {
    status: RunStatus,
    phase: LoopPhase,
    insights: Option<KnowledgeInsights>,
    trace: IterationTrace,
    final_artifacts: FinalArtifacts,
    failure: Option<FailureReport>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    sealed: bool,
}

/// Handle to one run. Cheap to clone; all clones observe the same state.
///
/// The convergence loop is the only writer. Readers get consistent copies:
/// a trace read while the loop is running is always a prefix of the final
/// trace. Once sealed, every write fails with `SessionSealed`.
#[derive(Debug, Clone)]
pub struct RunSession {
    run_id: RunId,
    config: Arc<PipelineConfig>,
    state: Arc<RwLock<SessionState>>,
}

impl RunSession {
    /// Open a new running session.
    pub fn start(config: PipelineConfig) -> Self {
        Self::start_with_id(RunId::new(), config)
    }

    pub fn start_with_id(run_id: RunId, config: PipelineConfig) -> Self {
        Self {
            run_id,
            config: Arc::new(config),
            state: Arc::new(RwLock::new(SessionState {
                status: RunStatus::Running,
                phase: LoopPhase::Extracting,
                insights: None,
                trace: IterationTrace::new(),
                final_artifacts: FinalArtifacts::default(),
                failure: None,
                started_at: Utc::now(),
                finished_at: None,
                sealed: false,
            })),
        }
    }

    /// Rebuild a read-only session from a persisted snapshot.
    pub fn restore(snapshot: RunSnapshot) -> Self {
        Self {
            run_id: snapshot.run_id,
            config: Arc::new(snapshot.config),
            state: Arc::new(RwLock::new(SessionState {
                status: snapshot.status,
                phase: snapshot.phase,
                insights: snapshot.insights,
                trace: snapshot.trace,
                final_artifacts: snapshot.final_artifacts,
                failure: snapshot.failure,
                started_at: snapshot.started_at,
                finished_at: snapshot.finished_at,
                sealed: true,
            })),
        }
    }

    pub fn id(&self) -> RunId {
        self.run_id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn current_status(&self) -> RunStatus {
        self.state.read().await.status
    }

    pub async fn phase(&self) -> LoopPhase {
        self.state.read().await.phase
    }

    pub async fn is_sealed(&self) -> bool {
        self.state.read().await.sealed
    }

    pub async fn trace(&self) -> IterationTrace {
        self.state.read().await.trace.clone()
    }

    pub async fn insights(&self) -> Option<KnowledgeInsights> {
        self.state.read().await.insights.clone()
    }

    pub async fn final_artifacts(&self) -> FinalArtifacts {
        self.state.read().await.final_artifacts.clone()
    }

    pub async fn failure(&self) -> Option<FailureReport> {
        self.state.read().await.failure.clone()
    }

    pub async fn snapshot(&self) -> RunSnapshot {
        let state = self.state.read().await;
        RunSnapshot {
            run_id: self.run_id,
            config: (*self.config).clone(),
            status: state.status,
            phase: state.phase,
            insights: state.insights.clone(),
            trace: state.trace.clone(),
            final_artifacts: state.final_artifacts.clone(),
            failure: state.failure.clone(),
            started_at: state.started_at,
            finished_at: state.finished_at,
        }
    }

    /// Move the loop to `next`, validating the transition.
    pub async fn transition(&self, next: LoopPhase) -> Result<LoopPhase, PipelineError> {
        let mut state = self.state.write().await;
        self.ensure_open(&state)?;

        let from = state.phase;
        if !from.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition { from, to: next });
        }
        state.phase = next;
        Ok(from)
    }

    pub async fn set_insights(&self, insights: KnowledgeInsights) -> Result<(), PipelineError> {
        let mut state = self.state.write().await;
        self.ensure_open(&state)?;
        state.insights = Some(insights);
        Ok(())
    }

    /// Track `artifact` as the latest of its kind.
    pub async fn record_artifact(&self, artifact: Artifact) -> Result<(), PipelineError> {
        let mut state = self.state.write().await;
        self.ensure_open(&state)?;

        let slot = match artifact.kind {
            ArtifactKind::Draft => &mut state.final_artifacts.draft,
            ArtifactKind::Review => &mut state.final_artifacts.last_review,
            ArtifactKind::Compliance => &mut state.final_artifacts.last_compliance,
        };
        *slot = Some(artifact);
        Ok(())
    }

    pub async fn append_entry(&self, entry: IterationEntry) -> Result<(), PipelineError> {
        let mut state = self.state.write().await;
        self.ensure_open(&state)?;
        let phase = state.phase;
        state
            .trace
            .append(entry)
            .map_err(|source| PipelineError::Store { phase, source })
    }

    pub async fn record_revision(
        &self,
        iteration: u32,
        version: u32,
        attempts: u32,
    ) -> Result<(), PipelineError> {
        let mut state = self.state.write().await;
        self.ensure_open(&state)?;
        let phase = state.phase;
        state
            .trace
            .record_revision(iteration, version, attempts)
            .map_err(|source| PipelineError::Store { phase, source })
    }

    /// Finish the run with a terminal status. No writes are accepted afterwards.
    pub async fn seal(
        &self,
        status: RunStatus,
        failure: Option<FailureReport>,
    ) -> Result<(), PipelineError> {
        let mut state = self.state.write().await;
        self.ensure_open(&state)?;

        if !status.is_terminal() {
            return Err(PipelineError::InvalidTransition {
                from: state.phase,
                to: LoopPhase::Finalizing,
            });
        }
        if state.phase != LoopPhase::Finalizing {
            state.phase = LoopPhase::Finalizing;
        }
        state.status = status;
        state.failure = failure;
        state.finished_at = Some(Utc::now());
        state.sealed = true;
        Ok(())
    }

    fn ensure_open(&self, state: &SessionState) -> Result<(), PipelineError> {
        if state.sealed {
            Err(PipelineError::SessionSealed(self.run_id))
        } else {
            Ok(())
        }
    }
}
