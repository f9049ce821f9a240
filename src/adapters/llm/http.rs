//! Shared HTTP plumbing for the provider clients.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::{Client as ReqwestClient, StatusCode};

use crate::domain::ports::GenerationError;
use crate::infrastructure::logging::SecretScrubbingLayer;

/// Connection settings common to every provider.
#[derive(Debug, Clone)]
pub struct HttpModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Upper bound on completion tokens.
    pub max_tokens: u32,
}

pub(super) fn build_client(timeout_secs: u64) -> Result<ReqwestClient, GenerationError> {
    ReqwestClient::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_max_idle_per_host(4)
        .tcp_nodelay(true)
        .build()
        .map_err(|e| GenerationError::provider(format!("failed to build HTTP client: {e}")))
}

/// Map a transport error, scrubbing anything that looks like a credential.
pub(super) fn transport_error(err: &reqwest::Error, timeout_secs: u64) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout {
            seconds: timeout_secs,
        }
    } else {
        GenerationError::provider(scrub(&err.to_string()))
    }
}

/// Map a non-success response to a generation error.
pub(super) fn status_error(status: StatusCode, body: &str, timeout_secs: u64) -> GenerationError {
    let detail = scrub(&truncate(body, 500));
    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationError::rate_limited(format!("{status}: {detail}")),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GenerationError::Timeout {
            seconds: timeout_secs,
        },
        _ => GenerationError::provider(format!("{status}: {detail}")),
    }
}

/// Compiled once and shared by every client.
fn scrubber() -> &'static SecretScrubbingLayer {
    static SCRUBBER: OnceLock<SecretScrubbingLayer> = OnceLock::new();
    SCRUBBER.get_or_init(SecretScrubbingLayer::new)
}

fn scrub(text: &str) -> String {
    scrubber().scrub_message(text)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "slow down", 30),
            GenerationError::RateLimited { .. }
        ));
        assert_eq!(
            status_error(StatusCode::GATEWAY_TIMEOUT, "", 30),
            GenerationError::Timeout { seconds: 30 }
        );
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom", 30),
            GenerationError::Provider { .. }
        ));
    }

    #[test]
    fn test_status_error_scrubs_keys() {
        let err = status_error(
            StatusCode::UNAUTHORIZED,
            "Incorrect API key provided: sk-proj-abcdefghijklmnopqrstuvwxyz",
            30,
        );
        assert!(!err.to_string().contains("abcdefghijklmnopqrstuvwxyz"));
    }

    #[test]
    fn test_scrubber_is_built_once() {
        assert!(std::ptr::eq(scrubber(), scrubber()));
        assert_eq!(scrub("Bearer abcdefghijklmnopqrstuvwxyz123"), scrub("Bearer abcdefghijklmnopqrstuvwxyz123"));
    }
}
