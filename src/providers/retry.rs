//! Retry configuration and the retrying provider decorator.
//!
//! [`RetryingDataProvider`] wraps any [`DataProvider`] and retries transient
//! errors (as classified by [`TollgateError::is_transient()`]) with
//! exponential backoff. All attempts run under the single budget reservation
//! the orchestrator took for the request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::traits::{DataProvider, ProviderRequest, ProviderResponse};
use crate::telemetry;
use crate::{Result, TollgateError};

/// Configuration for retry behaviour on transient errors.
///
/// ```rust
/// # use tollgate::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(3)
///     .initial_delay(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 2.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 250ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries. Default: 5s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Backoff for a 0-indexed attempt: `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Backoff for an attempt, preferring a provider `retry_after` hint.
    /// Hints are still capped at `max_delay`.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after
            .map(|hint| hint.min(self.max_delay))
            .unwrap_or_else(|| self.delay_for_attempt(attempt))
    }
}

/// Run `f` until it succeeds, fails permanently, or attempts run out.
pub(crate) async fn with_retry<F, Fut, T>(config: &RetryConfig, provider_name: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut last_err = None;
    for attempt in 0..attempts {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < attempts {
                    metrics::counter!(telemetry::RETRIES_TOTAL, "provider" => provider_name.to_owned())
                        .increment(1);
                    let delay = config.effective_delay(attempt, e.retry_after());
                    warn!(
                        provider = provider_name,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| TollgateError::Internal("retry loop ran zero attempts".into())))
}

/// Decorator that wraps a [`DataProvider`] with retry logic.
pub struct RetryingDataProvider {
    inner: Arc<dyn DataProvider>,
    config: RetryConfig,
}

impl RetryingDataProvider {
    pub fn new(inner: Arc<dyn DataProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl DataProvider for RetryingDataProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        with_retry(&self.config, self.inner.name(), || self.inner.fetch(request)).await
    }
}
