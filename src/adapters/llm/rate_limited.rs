//! Token-bucket throttling in front of a language model.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tracing::trace;

use crate::domain::models::RateLimitConfig;
use crate::domain::ports::{GenerationError, LanguageModel, PromptContext};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Waits for a token before every call to the wrapped model.
///
/// One limiter is shared by all agents of a process so concurrent runs
/// stay under the provider quota together.
pub struct RateLimitedModel {
    inner: Arc<dyn LanguageModel>,
    limiter: Arc<DirectLimiter>,
}

impl RateLimitedModel {
    pub fn new(inner: Arc<dyn LanguageModel>, config: &RateLimitConfig) -> Result<Self, GenerationError> {
        Ok(Self::with_limiter(inner, Arc::new(build_limiter(config)?)))
    }

    pub fn with_limiter(inner: Arc<dyn LanguageModel>, limiter: Arc<DirectLimiter>) -> Self {
        Self { inner, limiter }
    }
}

/// Build a direct limiter from `requests_per_second` and `burst_size`.
pub fn build_limiter(config: &RateLimitConfig) -> Result<DirectLimiter, GenerationError> {
    if !(config.requests_per_second.is_finite() && config.requests_per_second > 0.0) {
        return Err(GenerationError::provider(format!(
            "invalid requests_per_second: {}",
            config.requests_per_second
        )));
    }
    let burst = NonZeroU32::new(config.burst_size)
        .ok_or_else(|| GenerationError::provider("burst_size must be at least 1"))?;

    let period = Duration::from_secs_f64(1.0 / config.requests_per_second);
    let quota = Quota::with_period(period)
        .ok_or_else(|| GenerationError::provider("rate limit period is zero"))?
        .allow_burst(burst);

    Ok(RateLimiter::direct(quota))
}

#[async_trait]
impl LanguageModel for RateLimitedModel {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn generate(&self, prompt: &PromptContext) -> Result<String, GenerationError> {
        self.limiter.until_ready().await;
        trace!(provider = self.inner.name(), "rate limit token acquired");
        self.inner.generate(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingModel(AtomicU32);

    #[async_trait]
    impl LanguageModel for CountingModel {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn generate(&self, _prompt: &PromptContext) -> Result<String, GenerationError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("call {n}"))
        }
    }

    #[test]
    fn test_invalid_rate_is_rejected() {
        let config = RateLimitConfig {
            requests_per_second: 0.0,
            burst_size: 1,
        };
        assert!(build_limiter(&config).is_err());

        let config = RateLimitConfig {
            requests_per_second: 1.0,
            burst_size: 0,
        };
        assert!(build_limiter(&config).is_err());
    }

    #[tokio::test]
    async fn test_burst_passes_through() {
        let inner = Arc::new(CountingModel(AtomicU32::new(0)));
        let model = RateLimitedModel::new(
            inner.clone(),
            &RateLimitConfig {
                requests_per_second: 50.0,
                burst_size: 3,
            },
        )
        .unwrap();

        let prompt = PromptContext::new("m", "i", "u");
        for _ in 0..3 {
            model.generate(&prompt).await.unwrap();
        }
        assert_eq!(inner.0.load(Ordering::SeqCst), 3);
        assert_eq!(model.name(), "counting");
    }
}
