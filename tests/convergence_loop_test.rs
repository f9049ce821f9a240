//! Integration tests for the convergence loop.
//!
//! Every test drives the full agent sequence with scripted agents against the
//! in-memory version store.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use common::{
    clinical_input, compliance, pipeline_config, review, transient, MemoryBackends, ScriptedAgents,
    STUDY_ID,
};
use medscribe::adapters::agents::{ScriptStep, ScriptedAgent};
use medscribe::adapters::events::BroadcastEventSink;
use medscribe::adapters::memory::InMemoryVersionStore;
use medscribe::domain::models::{
    AgentRole, ArtifactKind, Decision, EventPayload, RunId, RunSnapshot, RunStatus,
};
use medscribe::domain::ports::{GenerationError, RunFilter, RunRepository, VersionStore};
use medscribe::domain::{DomainError, DomainResult, PipelineError};
use medscribe::services::{CancellationToken, ConvergenceLoop, PipelineRunner, RunOutcome, RunSession};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn run_loop(agents: ScriptedAgents, target: f64, max_iterations: u32) -> (RunOutcome, RunSession, Arc<InMemoryVersionStore>) {
    let store = Arc::new(InMemoryVersionStore::new());
    let session = RunSession::start(pipeline_config(target, max_iterations));
    let outcome = ConvergenceLoop::new(agents.build(), store.clone())
        .run(&session, clinical_input(), CancellationToken::never())
        .await;
    (outcome, session, store)
}

// ---------------------------------------------------------------------------
// Stopping policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_converges_after_one_revision() {
    common::setup_test_logging();
    let agents = ScriptedAgents::with_scores(&[(60.0, 60.0), (85.0, 75.0)]);

    let (outcome, session, store) = run_loop(agents, 80.0, 5).await;

    assert_eq!(outcome.status, RunStatus::Converged);
    assert_eq!(outcome.final_draft_version, Some(1));
    assert!(outcome.failure.is_none());

    let entries = outcome.trace.entries();
    assert_eq!(entries.len(), 2);
    assert!((entries[0].score.confidence - 60.0).abs() < 1e-9);
    assert_eq!(entries[0].decision, Decision::ContinueWithRevision);
    assert_eq!(entries[0].revision_version, Some(1));
    assert!((entries[1].score.confidence - 80.0).abs() < 1e-9);
    assert!(entries[1].score.passed);
    assert_eq!(entries[1].decision, Decision::StopConverged);
    assert_eq!(entries[1].draft_version, 1);

    let v0 = store.get(outcome.run_id, 0).await.unwrap();
    let v1 = store.get(outcome.run_id, 1).await.unwrap();
    assert_eq!(v0.content, "draft v0");
    assert_eq!(v1.content, "revised draft");
    assert!(matches!(
        store.get(outcome.run_id, 2).await,
        Err(DomainError::ArtifactNotFound { .. })
    ));

    let finals = session.final_artifacts().await;
    assert_eq!(finals.draft.map(|a| a.version), Some(1));
    assert_eq!(finals.last_review.map(|a| a.version), Some(1));
    assert_eq!(session.insights().await.unwrap().study_id, STUDY_ID);
    assert!(session.is_sealed().await);
}

#[tokio::test]
async fn test_stops_at_first_passing_iteration() {
    let agents = ScriptedAgents::with_scores(&[(90.0, 90.0), (10.0, 10.0)]);
    let reviser = agents.reviser.call_counter();

    let (outcome, _session, store) = run_loop(agents, 80.0, 5).await;

    assert_eq!(outcome.status, RunStatus::Converged);
    assert_eq!(outcome.trace.len(), 1);
    assert_eq!(outcome.final_draft_version, Some(0));
    assert_eq!(reviser.load(Ordering::SeqCst), 0);
    assert_eq!(store.list_versions(outcome.run_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_zero_iteration_budget_never_revises() {
    let agents = ScriptedAgents::steady(100.0);
    let reviser = agents.reviser.call_counter();

    let (outcome, _session, store) = run_loop(agents, 80.0, 0).await;

    assert_eq!(outcome.status, RunStatus::MaxIterationsReached);
    assert_eq!(outcome.trace.len(), 1);
    assert_eq!(outcome.trace.entries()[0].decision, Decision::StopExhausted);
    assert_eq!(outcome.trace.revision_count(), 0);
    assert_eq!(outcome.final_draft_version, Some(0));
    assert_eq!(reviser.load(Ordering::SeqCst), 0);
    assert!(store.get(outcome.run_id, 1).await.is_err());
}

#[tokio::test]
async fn test_iteration_budget_bounds_rounds_and_revisions() {
    let agents = ScriptedAgents::steady(10.0);

    let (outcome, _session, store) = run_loop(agents, 80.0, 3).await;

    assert_eq!(outcome.status, RunStatus::MaxIterationsReached);
    assert_eq!(outcome.trace.len(), 3);
    assert_eq!(outcome.trace.revision_count(), 2);
    assert_eq!(outcome.final_draft_version, Some(2));

    let drafts: Vec<u32> = store
        .list_versions(outcome.run_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.kind == ArtifactKind::Draft)
        .map(|m| m.version)
        .collect();
    assert_eq!(drafts, vec![0, 1, 2]);

    let iterations: Vec<u32> = outcome.trace.entries().iter().map(|e| e.iteration()).collect();
    assert_eq!(iterations, vec![0, 1, 2]);
}

// ---------------------------------------------------------------------------
// Retries and failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_reviewer_recovers_on_third_attempt() {
    let reviewer = ScriptedAgent::new(AgentRole::Reviewer)
        .with_steps([transient(), transient(), review(90.0)])
        .with_fallback(review(90.0));
    let agents = ScriptedAgents::steady(90.0).reviewer(reviewer);

    let (outcome, _session, _store) = run_loop(agents, 80.0, 3).await;

    assert_eq!(outcome.status, RunStatus::Converged);
    let diagnostics = outcome.trace.entries()[0].diagnostics;
    assert_eq!(diagnostics.reviewer_attempts, 3);
    assert_eq!(diagnostics.compliance_attempts, 1);
    assert_eq!(diagnostics.reviser_attempts, 0);
}

#[tokio::test]
async fn test_compliance_exhaustion_fails_run_and_keeps_drafts() {
    let compliance_agent = ScriptedAgent::new(AgentRole::Compliance)
        .with_steps([compliance(50.0)])
        .with_fallback(transient());
    let agents = ScriptedAgents::steady(50.0).compliance(compliance_agent);
    let calls = agents.compliance.call_counter();

    let (outcome, session, store) = run_loop(agents, 80.0, 5).await;

    assert_eq!(outcome.status, RunStatus::Failed);
    // one success in iteration 0, then the full bound in iteration 1
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let failure = outcome.failure.expect("failure report");
    assert_eq!(failure.agent, Some(AgentRole::Compliance));
    assert_eq!(failure.iteration, Some(1));
    assert_eq!(failure.last_score.map(|s| s.iteration), Some(0));
    assert!(failure.reason.contains("compliance"));
    assert!(matches!(
        outcome.error,
        Some(PipelineError::Evaluation { attempts: 3, .. })
    ));

    assert_eq!(store.get(outcome.run_id, 0).await.unwrap().version, 0);
    assert_eq!(store.get(outcome.run_id, 1).await.unwrap().version, 1);
    let latest_review = store.latest(outcome.run_id, ArtifactKind::Review).await.unwrap();
    assert_eq!(latest_review.map(|a| a.version), Some(0));

    assert_eq!(session.current_status().await, RunStatus::Failed);
    assert_eq!(session.trace().await.len(), 1);
}

#[tokio::test]
async fn test_knowledge_failure_is_fatal_without_retry() {
    let knowledge = ScriptedAgent::new(AgentRole::Knowledge)
        .with_fallback(ScriptStep::failure(GenerationError::provider("upstream unavailable")));
    let agents = ScriptedAgents::steady(90.0).knowledge(knowledge);
    let calls = agents.knowledge.call_counter();
    let composer = agents.composer.call_counter();

    let (outcome, _session, store) = run_loop(agents, 80.0, 3).await;

    assert_eq!(outcome.status, RunStatus::Failed);
    assert!(matches!(outcome.error, Some(PipelineError::KnowledgeExtraction { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(composer.load(Ordering::SeqCst), 0);
    assert_eq!(outcome.final_draft_version, None);
    assert!(store.list_versions(outcome.run_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_composer_failure_is_fatal() {
    let composer = ScriptedAgent::new(AgentRole::Composer)
        .with_fallback(ScriptStep::failure(GenerationError::malformed("empty completion")));
    let agents = ScriptedAgents::steady(90.0).composer(composer);
    let calls = agents.composer.call_counter();

    let (outcome, _session, store) = run_loop(agents, 80.0, 3).await;

    assert_eq!(outcome.status, RunStatus::Failed);
    assert!(matches!(outcome.error, Some(PipelineError::DraftGeneration { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(outcome.trace.is_empty());
    assert!(store.list_versions(outcome.run_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reviser_exhaustion_fails_run() {
    let reviser = ScriptedAgent::new(AgentRole::Reviser).with_fallback(transient());
    let agents = ScriptedAgents::steady(40.0).reviser(reviser);

    let (outcome, _session, store) = run_loop(agents, 80.0, 3).await;

    assert_eq!(outcome.status, RunStatus::Failed);
    assert!(matches!(
        outcome.error,
        Some(PipelineError::Revision { iteration: 0, attempts: 3, .. })
    ));
    assert_eq!(outcome.trace.len(), 1);
    assert_eq!(outcome.final_draft_version, Some(0));
    assert!(store.get(outcome.run_id, 1).await.is_err());
}

#[tokio::test]
async fn test_wrong_output_shape_is_retried_then_fails() {
    let reviewer = ScriptedAgent::new(AgentRole::Reviewer).with_fallback(ScriptStep::document("not a score"));
    let agents = ScriptedAgents::steady(90.0).reviewer(reviewer);
    let calls = agents.reviewer.call_counter();

    let (outcome, _session, _store) = run_loop(agents, 80.0, 3).await;

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(outcome.failure.and_then(|f| f.agent), Some(AgentRole::Reviewer));
}

// ---------------------------------------------------------------------------
// Events and inspection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_events_bracket_the_run() {
    let sink = Arc::new(BroadcastEventSink::default());
    let mut rx = sink.subscribe();
    let store = Arc::new(InMemoryVersionStore::new());
    let session = RunSession::start(pipeline_config(80.0, 3));

    let outcome = ConvergenceLoop::new(ScriptedAgents::with_scores(&[(60.0, 60.0), (90.0, 90.0)]).build(), store)
        .with_event_sink(sink.clone())
        .run(&session, clinical_input(), CancellationToken::never())
        .await;
    assert_eq!(outcome.status, RunStatus::Converged);

    let mut payloads = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.run_id, outcome.run_id);
        payloads.push(event.payload);
    }

    assert!(matches!(payloads.first(), Some(EventPayload::RunStarted { max_iterations: 3, .. })));
    assert!(matches!(
        payloads.last(),
        Some(EventPayload::RunFinished {
            status: RunStatus::Converged,
            final_draft_version: Some(1),
        })
    ));
    let decisions: Vec<Decision> = payloads
        .iter()
        .filter_map(|p| match p {
            EventPayload::DecisionTaken { decision, .. } => Some(*decision),
            _ => None,
        })
        .collect();
    assert_eq!(decisions, vec![Decision::ContinueWithRevision, Decision::StopConverged]);
    assert_eq!(sink.published(), payloads.len() as u64);
}

#[tokio::test]
async fn test_runner_persists_snapshot_for_inspection() {
    let backends = MemoryBackends::new();
    let runner = backends.runner(ScriptedAgents::with_scores(&[(60.0, 60.0), (85.0, 75.0)]).build());

    let completed = runner
        .run_to_completion(pipeline_config(80.0, 3), clinical_input())
        .await
        .unwrap();
    assert_eq!(completed.snapshot.status, RunStatus::Converged);
    assert!(completed.rendered.is_empty());
    assert!(completed.is_persisted());

    let inspector = medscribe::services::RunInspector::new(backends.store.clone(), backends.runs.clone());
    let prefix = &completed.outcome.run_id.to_string()[..8];
    let run_id = inspector.resolve(prefix).await.unwrap();
    assert_eq!(run_id, completed.outcome.run_id);

    let restored = inspector.session(run_id).await.unwrap();
    assert!(restored.is_sealed().await);
    assert_eq!(restored.trace().await, completed.outcome.trace);
    assert_eq!(restored.snapshot().await.study_id(), STUDY_ID);

    let latest = inspector.artifact(run_id, ArtifactKind::Draft, None).await.unwrap();
    assert_eq!(latest.version, 1);
}

/// Run repository whose writes always fail.
struct RejectingRunRepository;

#[async_trait]
impl RunRepository for RejectingRunRepository {
    async fn save(&self, _snapshot: &RunSnapshot) -> DomainResult<()> {
        Err(DomainError::DatabaseError("disk full".to_string()))
    }

    async fn get(&self, _run_id: RunId) -> DomainResult<Option<RunSnapshot>> {
        Ok(None)
    }

    async fn list(&self, _filter: RunFilter) -> DomainResult<Vec<RunSnapshot>> {
        Ok(Vec::new())
    }

    async fn delete(&self, _run_id: RunId) -> DomainResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_snapshot_save_failure_is_reported() {
    let store = Arc::new(InMemoryVersionStore::new());
    let runner = PipelineRunner::new(
        ScriptedAgents::steady(95.0).build(),
        store.clone(),
        Arc::new(RejectingRunRepository),
    );

    let completed = runner
        .run_to_completion(pipeline_config(80.0, 3), clinical_input())
        .await
        .unwrap();

    // The run itself converged and its draft is stored; only history is missing.
    assert_eq!(completed.outcome.status, RunStatus::Converged);
    assert!(!completed.is_persisted());
    assert!(matches!(
        completed.persist_error,
        Some(DomainError::DatabaseError(ref reason)) if reason == "disk full"
    ));
    assert!(store.get(completed.outcome.run_id, 0).await.is_ok());
}
