//! EmbeddedGateway - cache, ledger and providers in the caller's process

use std::sync::Arc;

use async_trait::async_trait;

use super::batch::BatchCoordinator;
use super::orchestrator::FetchOrchestrator;
use crate::budget::{BudgetLedger, BudgetStatus};
use crate::cache::{CacheStats, CacheStore};
use crate::types::{BatchRequest, BatchResponse, DataRequest, Envelope};
use crate::{DataGateway, Result, TollgateError};

/// In-process gateway. Built by [`crate::Tollgate::builder`].
///
/// Cheap to share: wrap it in an `Arc` and hand it to every request handler.
pub struct EmbeddedGateway {
    orchestrator: FetchOrchestrator,
    batch: BatchCoordinator,
    cache: Arc<CacheStore>,
    ledger: Arc<BudgetLedger>,
}

impl EmbeddedGateway {
    pub(crate) fn new(
        orchestrator: FetchOrchestrator,
        max_concurrent_upstream: usize,
        cache: Arc<CacheStore>,
        ledger: Arc<BudgetLedger>,
    ) -> Self {
        Self {
            batch: BatchCoordinator::new(orchestrator.clone(), max_concurrent_upstream),
            orchestrator,
            cache,
            ledger,
        }
    }

    /// Direct access to the cache store.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Direct access to the budget ledger.
    pub fn ledger(&self) -> &BudgetLedger {
        &self.ledger
    }
}

#[async_trait]
impl DataGateway for EmbeddedGateway {
    async fn fetch(&self, request: &DataRequest) -> Result<Envelope> {
        self.orchestrator.fetch(request).await
    }

    async fn batch(&self, request: &BatchRequest) -> Result<BatchResponse> {
        if request.companies.is_empty() {
            return Err(TollgateError::InvalidInput("batch has no companies".into()));
        }
        Ok(self.batch.run(request).await)
    }

    async fn budget_status(&self, provider: &str) -> Result<BudgetStatus> {
        self.ledger.status(provider)
    }

    async fn budget_statuses(&self) -> Result<Vec<BudgetStatus>> {
        self.ledger.statuses()
    }

    async fn cache_stats(&self) -> Result<CacheStats> {
        Ok(self.cache.stats())
    }

    fn name(&self) -> &str {
        "embedded"
    }
}
