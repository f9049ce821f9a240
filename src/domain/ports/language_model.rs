//! Language model port - interface for text generation backends.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

/// Marker the reviewer prompt asks the model to end its report with.
pub const COMPLETENESS_MARKER: &str = "OVERALL_COMPLETENESS_SCORE";
/// Marker the compliance prompt asks the model to end its report with.
pub const COMPLIANCE_MARKER: &str = "OVERALL_COMPLIANCE_SCORE";

/// Failure of a single generative call. Never carries partial output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("provider error: {cause}")]
    Provider { cause: String },

    #[error("malformed output: {cause}")]
    MalformedOutput { cause: String },

    #[error("rate limited: {cause}")]
    RateLimited { cause: String },

    #[error("timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl GenerationError {
    pub fn provider(cause: impl Into<String>) -> Self {
        Self::Provider { cause: cause.into() }
    }

    pub fn malformed(cause: impl Into<String>) -> Self {
        Self::MalformedOutput { cause: cause.into() }
    }

    pub fn rate_limited(cause: impl Into<String>) -> Self {
        Self::RateLimited { cause: cause.into() }
    }
}

/// Prompt handed to a language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    /// System instructions.
    pub instructions: String,
    /// User message.
    pub input: String,
    /// Model name to use.
    pub model: String,
    /// Ask the provider for a JSON object response when supported.
    pub json_response: bool,
}

impl PromptContext {
    pub fn new(model: impl Into<String>, instructions: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            input: input.into(),
            model: model.into(),
            json_response: false,
        }
    }

    pub fn expecting_json(mut self) -> Self {
        self.json_response = true;
        self
    }
}

/// Text generation backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &'static str;

    /// Generate a completion for the prompt.
    async fn generate(&self, prompt: &PromptContext) -> Result<String, GenerationError>;

    /// Generate a scored report and read the score from its `marker` line.
    async fn score(&self, prompt: &PromptContext, marker: &str) -> Result<(String, f64), GenerationError> {
        let report = self.generate(prompt).await?;
        let score = parse_score_marker(&report, marker)?;
        Ok((report, score))
    }
}

/// Read `<marker>: <number>` from a report.
///
/// The last occurrence wins. Markdown emphasis around the marker is tolerated.
/// A missing marker or a value outside 0-100 is `MalformedOutput`.
pub fn parse_score_marker(report: &str, marker: &str) -> Result<f64, GenerationError> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let number = NUMBER.get_or_init(|| {
        Regex::new(r"^[\s*_`:]*([0-9]+(?:\.[0-9]+)?)").expect("score marker regex is valid")
    });

    let value = report
        .rmatch_indices(marker)
        .find_map(|(idx, _)| {
            let rest = &report[idx + marker.len()..];
            number
                .captures(rest)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
        })
        .ok_or_else(|| GenerationError::malformed(format!("missing {marker} line")))?;

    if !(0.0..=100.0).contains(&value) {
        return Err(GenerationError::malformed(format!(
            "{marker} value {value} outside 0-100"
        )));
    }
    Ok(value)
}
