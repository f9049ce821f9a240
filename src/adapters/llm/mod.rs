//! Language model clients.

pub mod anthropic;
mod http;
pub mod openai;
pub mod rate_limited;
pub mod registry;

pub use anthropic::AnthropicModel;
pub use http::HttpModelConfig;
pub use openai::OpenAiModel;
pub use rate_limited::RateLimitedModel;
pub use registry::{ModelProvider, ModelRegistry};
