//! Logs pipeline events through `tracing`.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::models::{EventPayload, PipelineEvent};
use crate::domain::ports::EventSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: PipelineEvent) {
        let run_id = event.run_id.to_string();
        let run_id = run_id.as_str();
        match &event.payload {
            EventPayload::RunStarted {
                target_confidence,
                max_iterations,
            } => info!(run_id, target_confidence, max_iterations, "run started"),
            EventPayload::PhaseChanged { from, to } => {
                debug!(run_id, from = %from, to = %to, "phase changed");
            }
            EventPayload::IterationStarted {
                iteration,
                draft_version,
            } => info!(run_id, iteration, draft_version, "iteration started"),
            EventPayload::AgentRetry {
                agent,
                attempt,
                delay_ms,
                error,
            } => warn!(run_id, agent = %agent, attempt, delay_ms, error = %error, "agent call failed, retrying"),
            EventPayload::ArtifactStored { kind, version } => {
                debug!(run_id, kind = %kind, version, "artifact stored");
            }
            EventPayload::ScoreComputed { score } => info!(
                run_id,
                iteration = score.iteration,
                reviewer = score.reviewer_score,
                compliance = score.compliance_score,
                confidence = score.confidence,
                passed = score.passed,
                "score computed"
            ),
            EventPayload::DecisionTaken { iteration, decision } => {
                info!(run_id, iteration, decision = %decision, "decision taken");
            }
            EventPayload::IterationFinished { iteration } => debug!(run_id, iteration, "iteration finished"),
            EventPayload::RunFinished {
                status,
                final_draft_version,
            } => info!(run_id, status = %status, final_draft_version = ?final_draft_version, "run finished"),
        }
    }
}
