//! OpenAI chat-completions client.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::http::{build_client, status_error, transport_error, HttpModelConfig};
use crate::domain::ports::{GenerationError, LanguageModel, PromptContext};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Language model backed by `POST {base_url}/chat/completions`.
pub struct OpenAiModel {
    http_client: ReqwestClient,
    config: HttpModelConfig,
}

impl OpenAiModel {
    pub fn new(config: HttpModelConfig) -> Result<Self, GenerationError> {
        Ok(Self {
            http_client: build_client(config.timeout_secs)?,
            config,
        })
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env(base_url: Option<String>, timeout_secs: u64) -> Result<Self, GenerationError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| GenerationError::provider("OPENAI_API_KEY environment variable not set"))?;

        Self::new(HttpModelConfig {
            api_key,
            base_url: base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            timeout_secs,
            max_tokens: 8192,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn name(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip_all, fields(model = %prompt.model))]
    async fn generate(&self, prompt: &PromptContext) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &prompt.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.input,
                },
            ],
            max_tokens: self.config.max_tokens,
            response_format: prompt.json_response.then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.config.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, self.config.timeout_secs));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::malformed(format!("invalid chat completion body: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::malformed("chat completion has no content"))?;

        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}
