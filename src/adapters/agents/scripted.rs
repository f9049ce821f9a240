//! Scripted agent that replays queued responses.
//!
//! Used by tests and by `run --dry-run` to exercise the full loop without a
//! model provider.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::models::{AgentContext, AgentOutput, AgentRole, KnowledgeInsights};
use crate::domain::ports::{AgentInvoker, AgentSet, GenerationError};

/// Queued response for one call.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Respond(AgentOutput),
    Fail(GenerationError),
}

impl ScriptStep {
    pub fn document(text: impl Into<String>) -> Self {
        Self::Respond(AgentOutput::document(text))
    }

    pub fn evaluation(report: impl Into<String>, score: f64) -> Self {
        Self::Respond(AgentOutput::evaluation(report, score))
    }

    pub fn insights(study_id: impl Into<String>) -> Self {
        Self::Respond(AgentOutput::Insights(KnowledgeInsights {
            study_id: study_id.into(),
            ..Default::default()
        }))
    }

    pub fn failure(error: GenerationError) -> Self {
        Self::Fail(error)
    }
}

/// Agent that answers from a queue, repeating its fallback once drained.
pub struct ScriptedAgent {
    role: AgentRole,
    name: String,
    steps: Mutex<VecDeque<ScriptStep>>,
    fallback: Option<ScriptStep>,
    delay: Option<Duration>,
    calls: Arc<AtomicU32>,
}

impl ScriptedAgent {
    pub fn new(role: AgentRole) -> Self {
        Self {
            role,
            name: format!("scripted-{role}"),
            steps: Mutex::new(VecDeque::new()),
            fallback: None,
            delay: None,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn with_steps(mut self, steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        self.steps = Mutex::new(steps.into_iter().collect());
        self
    }

    /// Response returned whenever the queue is empty.
    pub fn with_fallback(mut self, step: ScriptStep) -> Self {
        self.fallback = Some(step);
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Shared counter of calls made so far.
    pub fn call_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentInvoker for ScriptedAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, context: AgentContext) -> Result<AgentOutput, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if context.role() != self.role {
            return Err(GenerationError::malformed(format!(
                "{} agent received {} context",
                self.role,
                context.role()
            )));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let step = self.steps.lock().await.pop_front();
        match step.or_else(|| self.fallback.clone()) {
            Some(ScriptStep::Respond(output)) => Ok(output),
            Some(ScriptStep::Fail(error)) => Err(error),
            None => Err(GenerationError::provider(format!(
                "{} script exhausted",
                self.name
            ))),
        }
    }
}

/// Agents for a dry run: scores climb each round until they pass the default target.
pub fn dry_run_agent_set() -> AgentSet {
    let document = |text: &str| ScriptStep::document(text);

    AgentSet {
        // Empty study id: the loop falls back to the record's NCT id.
        knowledge: Arc::new(ScriptedAgent::new(AgentRole::Knowledge).with_fallback(ScriptStep::insights(""))),
        composer: Arc::new(
            ScriptedAgent::new(AgentRole::Composer)
                .with_fallback(document("# Clinical Study Report\n\n(dry run draft)\n")),
        ),
        reviewer: Arc::new(
            ScriptedAgent::new(AgentRole::Reviewer)
                .with_steps([
                    ScriptStep::evaluation("Dry run review.\nOVERALL_COMPLETENESS_SCORE: 62", 62.0),
                    ScriptStep::evaluation("Dry run review.\nOVERALL_COMPLETENESS_SCORE: 78", 78.0),
                ])
                .with_fallback(ScriptStep::evaluation("Dry run review.\nOVERALL_COMPLETENESS_SCORE: 88", 88.0)),
        ),
        compliance: Arc::new(
            ScriptedAgent::new(AgentRole::Compliance)
                .with_steps([
                    ScriptStep::evaluation("Dry run compliance.\nOVERALL_COMPLIANCE_SCORE: 58", 58.0),
                    ScriptStep::evaluation("Dry run compliance.\nOVERALL_COMPLIANCE_SCORE: 74", 74.0),
                ])
                .with_fallback(ScriptStep::evaluation("Dry run compliance.\nOVERALL_COMPLIANCE_SCORE: 84", 84.0)),
        ),
        reviser: Arc::new(
            ScriptedAgent::new(AgentRole::Reviser)
                .with_fallback(document("# Clinical Study Report\n\n(dry run revision)\n")),
        ),
    }
}
