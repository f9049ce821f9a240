use regex::Regex;
use std::fmt;
use tracing::Subscriber;
use tracing_subscriber::Layer;

/// Layer that scrubs sensitive data from log messages
#[derive(Clone)]
pub struct SecretScrubbingLayer {
    api_key_pattern: Regex,
    token_pattern: Regex,
    bearer_pattern: Regex,
    password_pattern: Regex,
}

impl SecretScrubbingLayer {
    /// Create a new secret scrubbing layer
    pub fn new() -> Self {
        Self {
            // Match provider API keys: sk-ant-api03-..., sk-proj-..., sk-...
            api_key_pattern: Regex::new(r"sk-(?:ant-|proj-)?[a-zA-Z0-9\-_]{16,}").unwrap(),
            // Match generic tokens
            token_pattern: Regex::new(r#"["']?(?:api_key|apikey|token|secret)["']?\s*[:=]\s*["']?([a-zA-Z0-9-_\.]{20,})["']?"#).unwrap(),
            // Match Bearer tokens in Authorization headers
            bearer_pattern: Regex::new(r"Bearer\s+[a-zA-Z0-9-_\.]+").unwrap(),
            // Match password fields
            password_pattern: Regex::new(r#"["']?password["']?\s*[:=]\s*["']?([^"'\s,}]+)["']?"#).unwrap(),
        }
    }

    /// Scrub a message of sensitive data
    pub fn scrub_message(&self, message: &str) -> String {
        // Named fields first so `api_key: sk-...` keeps its field name.
        let mut scrubbed = self.token_pattern
            .replace_all(message, |caps: &regex::Captures| {
                let full_match = &caps[0];
                if let Some(colon_pos) = full_match.find(':') {
                    format!("{}:[REDACTED]", &full_match[..colon_pos])
                } else if let Some(eq_pos) = full_match.find('=') {
                    format!("{}=[REDACTED]", &full_match[..eq_pos])
                } else {
                    "[REDACTED]".to_string()
                }
            })
            .to_string();
        scrubbed = self.api_key_pattern
            .replace_all(&scrubbed, "[API_KEY_REDACTED]")
            .to_string();
        scrubbed = self.bearer_pattern
            .replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]")
            .to_string();
        scrubbed = self.password_pattern
            .replace_all(&scrubbed, "password=[REDACTED]")
            .to_string();
        scrubbed
    }
}

impl Default for SecretScrubbingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecretScrubbingLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubbingLayer").finish()
    }
}

/// Scrubbing happens where provider text enters an error, via `scrub_message`;
/// the layer itself passes events through unchanged.
impl<S: Subscriber> Layer<S> for SecretScrubbingLayer {}
