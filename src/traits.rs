//! Core DataGateway trait

use async_trait::async_trait;

use crate::Result;
use crate::budget::BudgetStatus;
use crate::cache::CacheStats;
use crate::types::{BatchRequest, BatchResponse, DataRequest, Envelope};

/// The gateway surface shared by the in-process gateway and the HTTP client.
///
/// Consumers hold an `Arc<dyn DataGateway>` and do not care whether the
/// cache and ledger live in their own process or in a `tolld` daemon.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Fetch one data type for one entity, from cache or upstream.
    ///
    /// Fails with `BudgetExhausted` or `UpstreamFailure` only when no cached
    /// record of any age can stand in.
    async fn fetch(&self, request: &DataRequest) -> Result<Envelope>;

    /// Fetch many `(entity, data_type)` pairs as one accounting unit.
    ///
    /// Individual failures are reported per item; the call itself only
    /// fails for transport or validation problems.
    async fn batch(&self, request: &BatchRequest) -> Result<BatchResponse>;

    /// Current budget for one provider.
    async fn budget_status(&self, provider: &str) -> Result<BudgetStatus>;

    /// Current budget for every provider, sorted by name.
    async fn budget_statuses(&self) -> Result<Vec<BudgetStatus>>;

    async fn cache_stats(&self) -> Result<CacheStats>;

    /// Gateway name for logging.
    fn name(&self) -> &str;
}
