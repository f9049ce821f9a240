//! Anthropic messages API client.
//!
//! Requires an API key (from config or the `ANTHROPIC_API_KEY` env var).

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::http::{build_client, status_error, transport_error, HttpModelConfig};
use crate::domain::ports::{GenerationError, LanguageModel, PromptContext};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Language model backed by `POST {base_url}/v1/messages`.
pub struct AnthropicModel {
    http_client: ReqwestClient,
    config: HttpModelConfig,
}

impl AnthropicModel {
    pub fn new(config: HttpModelConfig) -> Result<Self, GenerationError> {
        Ok(Self {
            http_client: build_client(config.timeout_secs)?,
            config,
        })
    }

    pub fn from_env(base_url: Option<String>, timeout_secs: u64) -> Result<Self, GenerationError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| GenerationError::provider("ANTHROPIC_API_KEY environment variable not set"))?;

        Self::new(HttpModelConfig {
            api_key,
            base_url: base_url.unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string()),
            timeout_secs,
            max_tokens: 8192,
        })
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    #[instrument(skip_all, fields(model = %prompt.model))]
    async fn generate(&self, prompt: &PromptContext) -> Result<String, GenerationError> {
        // The messages API has no JSON mode; the instructions already ask for JSON.
        let request = MessageRequest {
            model: &prompt.model,
            system: &prompt.instructions,
            messages: vec![Message {
                role: "user",
                content: &prompt.input,
            }],
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.config.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.config.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, self.config.timeout_secs));
        }

        let parsed: MessageResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::malformed(format!("invalid messages body: {e}")))?;

        if parsed.stop_reason.as_deref() == Some("max_tokens") {
            return Err(GenerationError::malformed("response truncated at max_tokens"));
        }

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(GenerationError::malformed("message has no text content"));
        }
        debug!(chars = text.len(), "message received");
        Ok(text)
    }
}
