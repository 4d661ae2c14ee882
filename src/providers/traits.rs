//! The upstream provider seam.
//!
//! A [`DataProvider`] is a paid external API that can produce one or more
//! data types for an entity. The gateway treats payloads as opaque JSON;
//! providers only report what the call cost and how much they trust the
//! result.
//!
//! # Example
//!
//! ```ignore
//! #[async_trait]
//! impl DataProvider for Quotes {
//!     fn name(&self) -> &str { "quotes" }
//!
//!     async fn fetch(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
//!         let data = self.lookup(&request.entity_id).await?;
//!         Ok(ProviderResponse::new(data).with_cost(Decimal::new(2, 2)))
//!     }
//! }
//! ```

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::Result;

/// What the gateway asks a provider for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    /// Normalized entity identifier.
    pub entity_id: String,
    pub data_type: String,
    /// Caller-supplied website hint, passed through untouched.
    pub website: Option<String>,
}

impl ProviderRequest {
    pub fn new(entity_id: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            data_type: data_type.into(),
            website: None,
        }
    }

    pub fn website(mut self, website: Option<String>) -> Self {
        self.website = website;
        self
    }
}

/// A provider's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub data: Value,
    /// Actual cost of the call. `None` settles at the estimated cost.
    pub cost: Option<Decimal>,
    /// Provider-declared confidence in `[0, 1]`. `None` uses the data type's default.
    pub confidence: Option<f64>,
}

impl ProviderResponse {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            cost: None,
            confidence: None,
        }
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// A paid upstream data source.
///
/// Errors should use the transport variants of [`crate::TollgateError`]
/// (`Http`, `Api`, `RateLimited`, `Timeout`, ...) so retry classification
/// via [`is_transient`](crate::TollgateError::is_transient) works.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Provider name; also the budget ledger account it is charged to.
    fn name(&self) -> &str;

    /// Fetch one data type for one entity.
    async fn fetch(&self, request: &ProviderRequest) -> Result<ProviderResponse>;
}
