//! Agents backed by a [`LanguageModel`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::prompts;
use crate::domain::models::{AgentContext, AgentOutput, AgentRole, KnowledgeInsights};
use crate::domain::ports::{
    AgentInvoker, GenerationError, LanguageModel, PromptContext, COMPLETENESS_MARKER,
    COMPLIANCE_MARKER,
};

/// Fills one pipeline role by prompting a language model.
pub struct PromptedAgent {
    role: AgentRole,
    name: String,
    model: Arc<dyn LanguageModel>,
    model_name: String,
}

#[derive(Deserialize)]
struct KnowledgePayload {
    #[serde(default)]
    nct_id: Option<String>,
    #[serde(default)]
    content_by_section: BTreeMap<String, String>,
}

impl PromptedAgent {
    pub fn new(role: AgentRole, model: Arc<dyn LanguageModel>, model_name: impl Into<String>) -> Self {
        let model_name = model_name.into();
        Self {
            role,
            name: format!("{role}@{model_name}"),
            model,
            model_name,
        }
    }

    fn prompt(&self, instructions: String, input: String) -> PromptContext {
        PromptContext::new(self.model_name.clone(), instructions, input)
    }

    async fn extract(&self, context: AgentContext) -> Result<AgentOutput, GenerationError> {
        let input = match context {
            AgentContext::Knowledge { input } => input,
            other => return Err(self.wrong_context(&other)),
        };

        let record = serde_json::to_string_pretty(&input.record)
            .map_err(|e| GenerationError::malformed(format!("clinical record is not serializable: {e}")))?;
        let prompt = self
            .prompt(prompts::knowledge_instructions(&input.template), record)
            .expecting_json();

        let raw = self.model.generate(&prompt).await?;
        let payload: KnowledgePayload = serde_json::from_str(strip_code_fence(&raw))
            .map_err(|e| GenerationError::malformed(format!("knowledge output is not valid JSON: {e}")))?;

        let study_id = payload
            .nct_id
            .filter(|id| !id.trim().is_empty())
            .or_else(|| input.nct_id().map(str::to_string))
            .unwrap_or_else(|| KnowledgeInsights::UNKNOWN_STUDY.to_string());

        Ok(AgentOutput::Insights(KnowledgeInsights {
            study_id,
            content_by_section: payload.content_by_section,
            raw,
        }))
    }

    fn wrong_context(&self, context: &AgentContext) -> GenerationError {
        GenerationError::malformed(format!(
            "{} agent received {} context",
            self.role,
            context.role()
        ))
    }
}

#[async_trait]
impl AgentInvoker for PromptedAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, context: AgentContext) -> Result<AgentOutput, GenerationError> {
        if context.role() != self.role {
            return Err(self.wrong_context(&context));
        }
        debug!(agent = %self.name, provider = self.model.name(), "invoking agent");

        match context {
            ctx @ AgentContext::Knowledge { .. } => self.extract(ctx).await,
            AgentContext::Composer {
                insights,
                template,
                sample_report,
            } => {
                let prompt = self.prompt(
                    prompts::composer_instructions(&template),
                    prompts::composer_input(&insights, sample_report.as_deref()),
                );
                Ok(AgentOutput::document(self.model.generate(&prompt).await?))
            }
            AgentContext::Reviewer { draft, .. } => {
                let prompt = self.prompt(prompts::reviewer_instructions(), draft);
                let (report, score) = self.model.score(&prompt, COMPLETENESS_MARKER).await?;
                Ok(AgentOutput::evaluation(report, score))
            }
            AgentContext::Compliance { draft } => {
                let prompt = self.prompt(prompts::compliance_instructions(), draft);
                let (report, score) = self.model.score(&prompt, COMPLIANCE_MARKER).await?;
                Ok(AgentOutput::evaluation(report, score))
            }
            AgentContext::Reviser {
                draft,
                review,
                compliance,
                ..
            } => {
                let prompt = self.prompt(
                    prompts::reviser_instructions(),
                    prompts::reviser_input(&draft, &review, &compliance),
                );
                Ok(AgentOutput::document(self.model.generate(&prompt).await?))
            }
        }
    }
}

/// Strip a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
