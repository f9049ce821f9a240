//! Provider registry: builds the agent set a run uses.

use std::sync::Arc;

use crate::adapters::agents::{dry_run_agent_set, PromptedAgent};
use crate::domain::models::{AgentRole, ModelSelection, RateLimitConfig};
use crate::domain::ports::{AgentInvoker, AgentSet, GenerationError, LanguageModel};

use super::anthropic::AnthropicModel;
use super::openai::OpenAiModel;
use super::rate_limited::RateLimitedModel;

/// Backends selectable through `model_selection.provider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    OpenAi,
    Anthropic,
    Scripted,
}

impl ModelProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            "scripted" | "dry-run" | "dry_run" => Some(Self::Scripted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Scripted => "scripted",
        }
    }
}

/// Registry of available model providers.
pub struct ModelRegistry {
    selection: ModelSelection,
    rate_limit: Option<RateLimitConfig>,
    model_override: Option<Arc<dyn LanguageModel>>,
}

impl ModelRegistry {
    pub fn new(selection: ModelSelection) -> Self {
        Self {
            selection,
            rate_limit: None,
            model_override: None,
        }
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Use `model` instead of constructing a provider client.
    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model_override = Some(model);
        self
    }

    pub fn provider(&self) -> Result<ModelProvider, GenerationError> {
        ModelProvider::from_str(&self.selection.provider).ok_or_else(|| {
            GenerationError::provider(format!("unknown model provider: {}", self.selection.provider))
        })
    }

    /// Create a language model client by provider type.
    pub fn create_model_by_type(&self, provider: ModelProvider) -> Result<Arc<dyn LanguageModel>, GenerationError> {
        let base: Arc<dyn LanguageModel> = match (&self.model_override, provider) {
            (Some(model), _) => Arc::clone(model),
            (None, ModelProvider::OpenAi) => Arc::new(OpenAiModel::from_env(
                self.selection.api_base.clone(),
                self.selection.request_timeout_secs,
            )?),
            (None, ModelProvider::Anthropic) => Arc::new(AnthropicModel::from_env(
                self.selection.api_base.clone(),
                self.selection.request_timeout_secs,
            )?),
            (None, ModelProvider::Scripted) => {
                return Err(GenerationError::provider("scripted provider has no language model"))
            }
        };

        match &self.rate_limit {
            Some(config) => Ok(Arc::new(RateLimitedModel::new(base, config)?)),
            None => Ok(base),
        }
    }

    /// Build the five agents for the configured provider.
    ///
    /// The reviser runs on the supervisor model; every other role uses the worker model.
    pub fn create_agent_set(&self) -> Result<AgentSet, GenerationError> {
        let provider = self.provider()?;
        if provider == ModelProvider::Scripted && self.model_override.is_none() {
            return Ok(dry_run_agent_set());
        }

        let model = self.create_model_by_type(provider)?;
        let agent = |role: AgentRole, model_name: &str| -> Arc<dyn AgentInvoker> {
            Arc::new(PromptedAgent::new(role, Arc::clone(&model), model_name))
        };
        let worker = self.selection.worker_model.as_str();

        Ok(AgentSet {
            knowledge: agent(AgentRole::Knowledge, worker),
            composer: agent(AgentRole::Composer, worker),
            reviewer: agent(AgentRole::Reviewer, worker),
            compliance: agent(AgentRole::Compliance, worker),
            reviser: agent(AgentRole::Reviser, &self.selection.supervisor_model),
        })
    }

    pub fn available_types() -> Vec<&'static str> {
        vec!["openai", "anthropic", "scripted"]
    }
}
