//! Common test utilities for integration tests
//!
//! Scripted agent sets, fast retry settings and input fixtures shared by the
//! pipeline tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use medscribe::adapters::agents::{ScriptStep, ScriptedAgent};
use medscribe::adapters::memory::{InMemoryRunRepository, InMemoryVersionStore};
use medscribe::domain::models::{AgentRole, ClinicalInput, PipelineConfig, RetryConfig};
use medscribe::domain::ports::{AgentSet, GenerationError};
use medscribe::services::PipelineRunner;

pub const STUDY_ID: &str = "NCT00000001";

/// Retry settings that keep backoff in the low milliseconds.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
    }
}

pub fn pipeline_config(target: f64, max_iterations: u32) -> PipelineConfig {
    PipelineConfig {
        target_confidence: target,
        max_iterations,
        retry: fast_retry(),
        ..PipelineConfig::default()
    }
}

pub fn clinical_input() -> ClinicalInput {
    let record = serde_json::json!({
        "protocolSection": {
            "identificationModule": {
                "nctId": STUDY_ID,
                "briefTitle": "A Study of Something"
            }
        }
    });
    ClinicalInput::new(record, "1. Title\n2. Synopsis\n3. Results\n").with_template_ref("template.txt")
}

pub fn review(score: f64) -> ScriptStep {
    ScriptStep::evaluation(format!("Review.\nOVERALL_COMPLETENESS_SCORE: {score}"), score)
}

pub fn compliance(score: f64) -> ScriptStep {
    ScriptStep::evaluation(format!("Compliance.\nOVERALL_COMPLIANCE_SCORE: {score}"), score)
}

pub fn transient() -> ScriptStep {
    ScriptStep::failure(GenerationError::rate_limited("429 from provider"))
}

/// Builder for an [`AgentSet`] of scripted agents.
pub struct ScriptedAgents {
    pub knowledge: ScriptedAgent,
    pub composer: ScriptedAgent,
    pub reviewer: ScriptedAgent,
    pub compliance: ScriptedAgent,
    pub reviser: ScriptedAgent,
}

impl ScriptedAgents {
    /// Agents that always answer: reviewer and compliance score `score` each round.
    pub fn steady(score: f64) -> Self {
        Self {
            knowledge: ScriptedAgent::new(AgentRole::Knowledge).with_fallback(ScriptStep::insights(STUDY_ID)),
            composer: ScriptedAgent::new(AgentRole::Composer).with_fallback(ScriptStep::document("draft v0")),
            reviewer: ScriptedAgent::new(AgentRole::Reviewer).with_fallback(review(score)),
            compliance: ScriptedAgent::new(AgentRole::Compliance).with_fallback(compliance(score)),
            reviser: ScriptedAgent::new(AgentRole::Reviser).with_fallback(ScriptStep::document("revised draft")),
        }
    }

    /// Score pairs per round; the last pair repeats.
    pub fn with_scores(scores: &[(f64, f64)]) -> Self {
        let (last_r, last_c) = scores.last().copied().unwrap_or((0.0, 0.0));
        let mut agents = Self::steady(0.0);
        agents.reviewer = ScriptedAgent::new(AgentRole::Reviewer)
            .with_steps(scores.iter().map(|(r, _)| review(*r)))
            .with_fallback(review(last_r));
        agents.compliance = ScriptedAgent::new(AgentRole::Compliance)
            .with_steps(scores.iter().map(|(_, c)| compliance(*c)))
            .with_fallback(compliance(last_c));
        agents
    }

    pub fn reviewer(mut self, agent: ScriptedAgent) -> Self {
        self.reviewer = agent;
        self
    }

    pub fn compliance(mut self, agent: ScriptedAgent) -> Self {
        self.compliance = agent;
        self
    }

    pub fn knowledge(mut self, agent: ScriptedAgent) -> Self {
        self.knowledge = agent;
        self
    }

    pub fn composer(mut self, agent: ScriptedAgent) -> Self {
        self.composer = agent;
        self
    }

    pub fn reviser(mut self, agent: ScriptedAgent) -> Self {
        self.reviser = agent;
        self
    }

    /// Slow every evaluator call down, for cancellation tests.
    pub fn slow_evaluators(mut self, delay: Duration) -> Self {
        self.reviewer = self.reviewer.with_delay(delay);
        self.compliance = self.compliance.with_delay(delay);
        self
    }

    pub fn build(self) -> AgentSet {
        AgentSet {
            knowledge: Arc::new(self.knowledge),
            composer: Arc::new(self.composer),
            reviewer: Arc::new(self.reviewer),
            compliance: Arc::new(self.compliance),
            reviser: Arc::new(self.reviser),
        }
    }
}

pub struct MemoryBackends {
    pub store: Arc<InMemoryVersionStore>,
    pub runs: Arc<InMemoryRunRepository>,
}

impl MemoryBackends {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryVersionStore::new()),
            runs: Arc::new(InMemoryRunRepository::new()),
        }
    }

    pub fn runner(&self, agents: AgentSet) -> PipelineRunner {
        PipelineRunner::new(agents, self.store.clone(), self.runs.clone())
    }
}

/// Initialize a test subscriber; safe to call from every test.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
