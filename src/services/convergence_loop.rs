//! The iterative review/revise convergence loop.
//!
//! Sequence per run:
//!
//! 1. Knowledge extraction, once. Fatal on failure.
//! 2. Composer writes draft v0. Fatal on failure.
//! 3. For `iteration = 0, 1, ...`: reviewer and compliance evaluate the
//!    current draft concurrently (each under the retry policy), both reports
//!    are stored, a [`ScoreRecord`] is appended, and
//!    [`ScoreAggregator::decide`] picks converged, exhausted, or revise.
//! 4. The session is sealed with exactly one terminal status.
//!
//! Cancellation is checked at the top of every iteration and raced against
//! every in-flight agent call; a cancelled call never writes an artifact.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use super::cancellation::CancellationToken;
use super::retry::{Attempted, RetryPolicy};
use super::run_session::RunSession;
use super::score_aggregator::ScoreAggregator;
use crate::domain::errors::PipelineError;
use crate::domain::models::{
    AgentContext, AgentOutput, AgentRole, Artifact, ArtifactKind, ClinicalInput, Decision,
    EventPayload, FailureReport, IterationEntry, IterationTrace, KnowledgeInsights, LoopPhase,
    PipelineEvent, RetryDiagnostics, RunId, RunStatus,
};
use crate::domain::ports::{
    expect_document, expect_evaluation, expect_insights, AgentSet, EventSink, GenerationError,
    NullEventSink, VersionStore,
};

/// Result of one run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub status: RunStatus,
    /// Version of the last draft stored, if any draft was produced.
    pub final_draft_version: Option<u32>,
    pub trace: IterationTrace,
    pub failure: Option<FailureReport>,
    pub error: Option<PipelineError>,
}

enum Halt {
    Cancelled,
    Failed(PipelineError),
}

impl From<PipelineError> for Halt {
    fn from(err: PipelineError) -> Self {
        Self::Failed(err)
    }
}

/// Drives the agent sequence for a [`RunSession`].
#[derive(Clone)]
pub struct ConvergenceLoop {
    agents: AgentSet,
    store: Arc<dyn VersionStore>,
    events: Arc<dyn EventSink>,
}

impl ConvergenceLoop {
    pub fn new(agents: AgentSet, store: Arc<dyn VersionStore>) -> Self {
        Self {
            agents,
            store,
            events: Arc::new(NullEventSink),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn store(&self) -> &Arc<dyn VersionStore> {
        &self.store
    }

    /// Execute the whole pipeline for `session` and seal it.
    ///
    /// Never panics on agent or storage failure; failures are reported in the
    /// returned outcome and in the sealed session.
    pub async fn run(
        &self,
        session: &RunSession,
        input: ClinicalInput,
        cancel: CancellationToken,
    ) -> RunOutcome {
        let run_id = session.id();
        let span = info_span!("run", run_id = %run_id);

        async {
            let config = session.config();
            info!(
                target_confidence = config.target_confidence,
                max_iterations = config.max_iterations,
                "run started"
            );
            self.emit(
                run_id,
                EventPayload::RunStarted {
                    target_confidence: config.target_confidence,
                    max_iterations: config.max_iterations,
                },
            )
            .await;

            let result = self.drive(session, input, &cancel).await;
            self.finish(session, result).await
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        session: &RunSession,
        input: ClinicalInput,
        cancel: &CancellationToken,
    ) -> Result<RunStatus, Halt> {
        let run_id = session.id();
        let config = session.config();
        let retry = RetryPolicy::from(&config.retry);
        let aggregator = ScoreAggregator::new(config.combiner);

        if cancel.is_cancelled() {
            return Err(Halt::Cancelled);
        }

        // 1. Knowledge extraction
        let knowledge = Arc::clone(&self.agents.knowledge);
        let output = race(cancel, knowledge.invoke(AgentContext::Knowledge { input: input.clone() })).await?;
        let mut insights = output
            .and_then(|o| expect_insights(AgentRole::Knowledge, o))
            .map_err(|source| PipelineError::KnowledgeExtraction { source })?;
        if insights.study_id.trim().is_empty() {
            insights.study_id = input
                .nct_id()
                .unwrap_or(KnowledgeInsights::UNKNOWN_STUDY)
                .to_string();
        }
        info!(study_id = %insights.study_id, sections = insights.content_by_section.len(), "knowledge extracted");
        session.set_insights(insights.clone()).await?;

        // 2. Initial draft
        self.enter(session, LoopPhase::Drafting).await?;
        let composer = Arc::clone(&self.agents.composer);
        let output = race(
            cancel,
            composer.invoke(AgentContext::Composer {
                insights: insights.clone(),
                template: input.template.clone(),
                sample_report: input.sample_report.clone(),
            }),
        )
        .await?;
        let text = output
            .and_then(|o| expect_document(AgentRole::Composer, o))
            .map_err(|source| PipelineError::DraftGeneration { source })?;
        let mut draft = Artifact::initial(run_id, ArtifactKind::Draft, text, composer.name());
        self.store_artifact(session, &draft, LoopPhase::Drafting).await?;

        // 3. Evaluate / decide / revise
        let mut iteration: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                info!(iteration, "cancellation requested");
                return Err(Halt::Cancelled);
            }

            self.enter(session, LoopPhase::Evaluating).await?;
            self.emit(
                run_id,
                EventPayload::IterationStarted {
                    iteration,
                    draft_version: draft.version,
                },
            )
            .await;

            let reviewer_ctx = AgentContext::Reviewer {
                draft: draft.content.clone(),
                insights: insights.clone(),
            };
            let compliance_ctx = AgentContext::Compliance {
                draft: draft.content.clone(),
            };
            let (review, compliance) = race(cancel, async {
                tokio::join!(
                    self.call_with_retry(run_id, AgentRole::Reviewer, &retry, reviewer_ctx, expect_evaluation),
                    self.call_with_retry(run_id, AgentRole::Compliance, &retry, compliance_ctx, expect_evaluation),
                )
            })
            .await?;

            let review = review.map_err(|failed| evaluation_error(iteration, AgentRole::Reviewer, failed))?;
            let compliance =
                compliance.map_err(|failed| evaluation_error(iteration, AgentRole::Compliance, failed))?;

            let review_artifact = Artifact::at_version(
                run_id,
                ArtifactKind::Review,
                iteration,
                review.value.report.clone(),
                self.agents.reviewer.name(),
            );
            let compliance_artifact = Artifact::at_version(
                run_id,
                ArtifactKind::Compliance,
                iteration,
                compliance.value.report.clone(),
                self.agents.compliance.name(),
            );
            let review_version = self
                .store_artifact(session, &review_artifact, LoopPhase::Evaluating)
                .await?;
            let compliance_version = self
                .store_artifact(session, &compliance_artifact, LoopPhase::Evaluating)
                .await?;

            self.enter(session, LoopPhase::Deciding).await?;
            let score = aggregator.record(
                iteration,
                review.value.score,
                compliance.value.score,
                config.target_confidence,
            );
            let decision = ScoreAggregator::decide(
                score.confidence,
                config.target_confidence,
                iteration,
                config.max_iterations,
            );
            info!(
                iteration,
                reviewer = score.reviewer_score,
                compliance = score.compliance_score,
                confidence = score.confidence,
                decision = %decision,
                "iteration scored"
            );

            session
                .append_entry(IterationEntry {
                    draft_version: draft.version,
                    score,
                    review_version,
                    compliance_version,
                    decision,
                    revision_version: None,
                    diagnostics: RetryDiagnostics {
                        reviewer_attempts: review.attempts,
                        compliance_attempts: compliance.attempts,
                        reviser_attempts: 0,
                    },
                })
                .await?;
            self.emit(run_id, EventPayload::ScoreComputed { score }).await;
            self.emit(run_id, EventPayload::DecisionTaken { iteration, decision })
                .await;

            match decision {
                Decision::StopConverged => {
                    self.emit(run_id, EventPayload::IterationFinished { iteration })
                        .await;
                    return Ok(RunStatus::Converged);
                }
                Decision::StopExhausted => {
                    self.emit(run_id, EventPayload::IterationFinished { iteration })
                        .await;
                    return Ok(RunStatus::MaxIterationsReached);
                }
                Decision::ContinueWithRevision => {}
            }

            self.enter(session, LoopPhase::Revising).await?;
            let reviser_ctx = AgentContext::Reviser {
                draft: draft.content.clone(),
                review: review.value.report,
                compliance: compliance.value.report,
                insights: insights.clone(),
            };
            let revised = race(
                cancel,
                self.call_with_retry(run_id, AgentRole::Reviser, &retry, reviser_ctx, expect_document),
            )
            .await?
            .map_err(|failed| PipelineError::Revision {
                iteration,
                attempts: failed.attempts,
                source: failed.value,
            })?;

            let next = draft.revise(revised.value, self.agents.reviser.name());
            let version = self
                .store_artifact(session, &next, LoopPhase::Revising)
                .await?;
            session
                .record_revision(iteration, version, revised.attempts)
                .await?;
            self.emit(run_id, EventPayload::IterationFinished { iteration })
                .await;

            draft = next;
            iteration += 1;
        }
    }

    async fn finish(&self, session: &RunSession, result: Result<RunStatus, Halt>) -> RunOutcome {
        let run_id = session.id();

        let (status, failure, mut error) = match result {
            Ok(status) => (status, None, None),
            Err(Halt::Cancelled) => (RunStatus::Cancelled, None, None),
            Err(Halt::Failed(err)) => {
                let report = FailureReport {
                    phase: session.phase().await,
                    iteration: err.iteration(),
                    agent: err.agent(),
                    reason: err.to_string(),
                    last_score: session.trace().await.last_score(),
                };
                warn!(error = %err, phase = %report.phase, "run failed");
                (RunStatus::Failed, Some(report), Some(err))
            }
        };

        if let Err(err) = self.enter(session, LoopPhase::Finalizing).await {
            debug!(error = %err, "finalizing transition skipped");
        }
        if let Err(err) = session.seal(status, failure.clone()).await {
            warn!(error = %err, "session could not be sealed");
            error.get_or_insert(err);
        }

        let status = session.current_status().await;
        let final_draft_version = session.final_artifacts().await.draft.map(|a| a.version);
        let trace = session.trace().await;

        info!(
            status = %status,
            iterations = trace.len(),
            final_draft = ?final_draft_version,
            "run finished"
        );
        self.emit(
            run_id,
            EventPayload::RunFinished {
                status,
                final_draft_version,
            },
        )
        .await;

        RunOutcome {
            run_id,
            status,
            final_draft_version,
            trace,
            failure: session.failure().await,
            error,
        }
    }

    /// Invoke `role` under the retry policy, checking the output shape.
    async fn call_with_retry<T>(
        &self,
        run_id: RunId,
        role: AgentRole,
        retry: &RetryPolicy,
        context: AgentContext,
        parse: fn(AgentRole, AgentOutput) -> Result<T, GenerationError>,
    ) -> Result<Attempted<T>, Attempted<GenerationError>> {
        let agent = Arc::clone(self.agents.get(role));
        let events = Arc::clone(&self.events);

        retry
            .execute_observed(
                || {
                    let agent = Arc::clone(&agent);
                    let context = context.clone();
                    async move { agent.invoke(context).await.and_then(|o| parse(role, o)) }
                },
                |notice| {
                    // Awaited before the backoff sleep starts.
                    let events = Arc::clone(&events);
                    let payload = EventPayload::AgentRetry {
                        agent: role,
                        attempt: notice.attempt,
                        delay_ms: u64::try_from(notice.delay.as_millis()).unwrap_or(u64::MAX),
                        error: notice.error.to_string(),
                    };
                    async move { events.publish(PipelineEvent::new(run_id, payload)).await }
                },
            )
            .await
    }

    async fn store_artifact(
        &self,
        session: &RunSession,
        artifact: &Artifact,
        phase: LoopPhase,
    ) -> Result<u32, PipelineError> {
        let version = self
            .store
            .put(artifact)
            .await
            .map_err(|source| PipelineError::Store { phase, source })?;
        session.record_artifact(artifact.clone()).await?;

        debug!(kind = %artifact.kind, version, "artifact stored");
        self.emit(
            session.id(),
            EventPayload::ArtifactStored {
                kind: artifact.kind,
                version,
            },
        )
        .await;
        Ok(version)
    }

    async fn enter(&self, session: &RunSession, next: LoopPhase) -> Result<(), PipelineError> {
        let from = session.transition(next).await?;
        self.emit(session.id(), EventPayload::PhaseChanged { from, to: next })
            .await;
        Ok(())
    }

    async fn emit(&self, run_id: RunId, payload: EventPayload) {
        self.events.publish(PipelineEvent::new(run_id, payload)).await;
    }
}

fn evaluation_error(iteration: u32, agent: AgentRole, failed: Attempted<GenerationError>) -> PipelineError {
    PipelineError::Evaluation {
        iteration,
        agent,
        attempts: failed.attempts,
        source: failed.value,
    }
}

/// Run `fut` unless cancellation fires first.
async fn race<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, Halt> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Halt::Cancelled),
        out = fut => Ok(out),
    }
}
