//! Agent invoker port - one generative step of the pipeline.

use std::sync::Arc;

use async_trait::async_trait;

use super::language_model::GenerationError;
use crate::domain::models::{AgentContext, AgentOutput, AgentRole, Evaluation, KnowledgeInsights};

/// Wraps a single generative call for one role.
///
/// Implementations must either return a complete output or an error; partial
/// output is never surfaced.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Role this invoker fills.
    fn role(&self) -> AgentRole;

    /// Identifier recorded as `produced_by` on stored artifacts.
    fn name(&self) -> &str;

    async fn invoke(&self, context: AgentContext) -> Result<AgentOutput, GenerationError>;
}

/// The five invokers that make up one pipeline.
#[derive(Clone)]
pub struct AgentSet {
    pub knowledge: Arc<dyn AgentInvoker>,
    pub composer: Arc<dyn AgentInvoker>,
    pub reviewer: Arc<dyn AgentInvoker>,
    pub compliance: Arc<dyn AgentInvoker>,
    pub reviser: Arc<dyn AgentInvoker>,
}

impl AgentSet {
    pub fn get(&self, role: AgentRole) -> &Arc<dyn AgentInvoker> {
        match role {
            AgentRole::Knowledge => &self.knowledge,
            AgentRole::Composer => &self.composer,
            AgentRole::Reviewer => &self.reviewer,
            AgentRole::Compliance => &self.compliance,
            AgentRole::Reviser => &self.reviser,
        }
    }
}

impl std::fmt::Debug for AgentSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSet")
            .field("knowledge", &self.knowledge.name())
            .field("composer", &self.composer.name())
            .field("reviewer", &self.reviewer.name())
            .field("compliance", &self.compliance.name())
            .field("reviser", &self.reviser.name())
            .finish()
    }
}

fn mismatch(role: AgentRole, output: &AgentOutput) -> GenerationError {
    GenerationError::malformed(format!(
        "{role} agent returned {} output",
        output.kind()
    ))
}

/// Unwrap an insights output or report the mismatch as malformed.
pub fn expect_insights(role: AgentRole, output: AgentOutput) -> Result<KnowledgeInsights, GenerationError> {
    match output {
        AgentOutput::Insights(insights) => Ok(insights),
        other => Err(mismatch(role, &other)),
    }
}

/// Unwrap a document output or report the mismatch as malformed.
pub fn expect_document(role: AgentRole, output: AgentOutput) -> Result<String, GenerationError> {
    match output {
        AgentOutput::Document { text } => Ok(text),
        other => Err(mismatch(role, &other)),
    }
}

/// Unwrap an evaluation output or report the mismatch as malformed.
///
/// Scores outside 0-100 are rejected here too.
pub fn expect_evaluation(role: AgentRole, output: AgentOutput) -> Result<Evaluation, GenerationError> {
    match output {
        AgentOutput::Evaluation(eval) if (0.0..=100.0).contains(&eval.score) => Ok(eval),
        AgentOutput::Evaluation(eval) => Err(GenerationError::malformed(format!(
            "{role} score {} outside 0-100",
            eval.score
        ))),
        other => Err(mismatch(role, &other)),
    }
}
