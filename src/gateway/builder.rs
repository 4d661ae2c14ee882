//! Builder for configuring gateway instances

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::EmbeddedGateway;
use super::batch::DEFAULT_MAX_CONCURRENT_UPSTREAM;
use super::orchestrator::FetchOrchestrator;
use crate::budget::BudgetLedger;
use crate::cache::{CacheConfig, CacheStore};
use crate::clock::{Clock, SystemClock};
use crate::confidence::{ConfidenceScorer, DEFAULT_CONFIDENCE_FLOOR};
use crate::providers::{ProviderRegistry, ProviderSpec, RetryConfig};
use crate::{Result, TollgateError};

/// Default bound on a single upstream call, retries included.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Main entry point for creating gateway instances.
pub struct Tollgate;

impl Tollgate {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> TollgateBuilder {
        TollgateBuilder::new()
    }
}

/// Builder for configuring gateway instances.
pub struct TollgateBuilder {
    providers: Vec<ProviderSpec>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    retry: Option<RetryConfig>,
    cache: CacheConfig,
    confidence_floor: f64,
    max_concurrent_upstream: usize,
}

impl Default for TollgateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TollgateBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            clock: Arc::new(SystemClock),
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
            retry: Some(RetryConfig::default()),
            cache: CacheConfig::default(),
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            max_concurrent_upstream: DEFAULT_MAX_CONCURRENT_UPSTREAM,
        }
    }

    /// Add a provider with its budget and data types.
    pub fn provider(mut self, spec: ProviderSpec) -> Self {
        self.providers.push(spec);
        self
    }

    /// Replace the time source (tests use [`crate::clock::ManualClock`]).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound every upstream call, retries included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry transient provider errors. Pass [`RetryConfig::disabled`] to turn off.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Confidence score a fully aged record decays to.
    pub fn confidence_floor(mut self, floor: f64) -> Self {
        self.confidence_floor = floor;
        self
    }

    /// Upstream calls a batch may run at once.
    pub fn max_concurrent_upstream(mut self, n: usize) -> Self {
        self.max_concurrent_upstream = n;
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// - [`TollgateError::NoProvider`] if no provider was added
    /// - [`TollgateError::Configuration`] for duplicate providers or data
    ///   types, negative caps or costs, or a zero timeout
    pub fn build(self) -> Result<EmbeddedGateway> {
        if self.providers.is_empty() {
            return Err(TollgateError::NoProvider);
        }
        if self.timeout.is_zero() {
            return Err(TollgateError::Configuration(
                "upstream timeout must be greater than zero".into(),
            ));
        }

        let mut registry = ProviderRegistry::new();
        if let Some(retry) = self.retry {
            registry.set_retry_config(retry);
        }
        let mut ledger = BudgetLedger::new(self.clock.clone());

        for spec in &self.providers {
            registry.register(spec)?;
            ledger.register(spec.provider.name(), spec.budget.clone())?;
            info!(
                provider = spec.provider.name(),
                cap = %spec.budget.cap,
                data_types = spec.data_types.len(),
                "provider configured"
            );
        }

        let cache = Arc::new(CacheStore::new(&self.cache, self.clock.clone()));
        let ledger = Arc::new(ledger);
        let orchestrator = FetchOrchestrator::new(
            cache.clone(),
            ledger.clone(),
            Arc::new(registry),
            ConfidenceScorer::new(self.confidence_floor),
            self.clock,
            self.timeout,
        );

        Ok(EmbeddedGateway::new(
            orchestrator,
            self.max_concurrent_upstream,
            cache,
            ledger,
        ))
    }
}
