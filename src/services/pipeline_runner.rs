//! Starts independent runs and takes care of what happens after them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};

use super::cancellation::{cancellation_pair, CancellationHandle};
use super::convergence_loop::{ConvergenceLoop, RunOutcome};
use super::run_session::RunSession;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ClinicalInput, PipelineConfig, RunSnapshot};
use crate::domain::ports::{AgentSet, ArtifactRenderer, EventSink, RunRepository, VersionStore};

/// Everything known about a run once its task has finished.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub outcome: RunOutcome,
    pub snapshot: RunSnapshot,
    /// Files written by the renderer, in version order.
    pub rendered: Vec<PathBuf>,
    /// Set when the snapshot could not be saved; the run is then absent from history.
    pub persist_error: Option<DomainError>,
}

impl CompletedRun {
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Handle to a spawned run.
#[derive(Debug)]
pub struct RunHandle {
    session: RunSession,
    cancel: CancellationHandle,
    task: JoinHandle<CompletedRun>,
}

impl RunHandle {
    /// Live view of the run; safe to poll while it executes.
    pub fn session(&self) -> &RunSession {
        &self.session
    }

    /// Request cancellation. The run ends as `Cancelled` at its next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to finish.
    pub async fn wait(self) -> Result<CompletedRun> {
        self.task.await.context("run task panicked or was aborted")
    }
}

/// Spawns each run on its own tokio task; runs share no mutable state.
#[derive(Clone)]
pub struct PipelineRunner {
    agents: AgentSet,
    store: Arc<dyn VersionStore>,
    runs: Arc<dyn RunRepository>,
    events: Option<Arc<dyn EventSink>>,
    renderer: Option<Arc<dyn ArtifactRenderer>>,
}

impl PipelineRunner {
    pub fn new(agents: AgentSet, store: Arc<dyn VersionStore>, runs: Arc<dyn RunRepository>) -> Self {
        Self {
            agents,
            store,
            runs,
            events: None,
            renderer: None,
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ArtifactRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Start a run in the background.
    pub fn start(&self, config: PipelineConfig, input: ClinicalInput) -> RunHandle {
        let session = RunSession::start(config);
        let (cancel, token) = cancellation_pair();

        let mut pipeline = ConvergenceLoop::new(self.agents.clone(), Arc::clone(&self.store));
        if let Some(events) = &self.events {
            pipeline = pipeline.with_event_sink(Arc::clone(events));
        }

        let runner = self.clone();
        let task_session = session.clone();
        let span = tracing::info_span!("pipeline", run_id = %session.id());
        let task = tokio::spawn(
            async move {
                let outcome = pipeline.run(&task_session, input, token).await;
                runner.complete(&task_session, outcome).await
            }
            .instrument(span),
        );

        RunHandle {
            session,
            cancel,
            task,
        }
    }

    /// Start a run and wait for it.
    pub async fn run_to_completion(&self, config: PipelineConfig, input: ClinicalInput) -> Result<CompletedRun> {
        self.start(config, input).wait().await
    }

    async fn complete(&self, session: &RunSession, outcome: RunOutcome) -> CompletedRun {
        let snapshot = session.snapshot().await;

        let persist_error = self.runs.save(&snapshot).await.err();
        if let Some(err) = &persist_error {
            error!(error = %err, "failed to persist run snapshot");
        }

        let rendered = match &self.renderer {
            Some(renderer) => match self.render_all(renderer.as_ref(), &snapshot).await {
                Ok(paths) => paths,
                Err(err) => {
                    warn!(error = %err, "failed to render artifacts");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if let Some(elapsed) = snapshot.elapsed() {
            info!(
                status = %snapshot.status,
                elapsed_ms = elapsed.num_milliseconds(),
                files = rendered.len(),
                "run completed"
            );
        }

        CompletedRun {
            outcome,
            snapshot,
            rendered,
            persist_error,
        }
    }

    async fn render_all(&self, renderer: &dyn ArtifactRenderer, snapshot: &RunSnapshot) -> DomainResult<Vec<PathBuf>> {
        let study_id = snapshot.study_id();
        let mut paths = Vec::new();
        for meta in self.store.list_versions(snapshot.run_id).await? {
            let artifact = self
                .store
                .get_kind(meta.run_id, meta.kind, meta.version)
                .await?;
            paths.push(renderer.render(study_id, &artifact).await?);
        }
        Ok(paths)
    }
}
