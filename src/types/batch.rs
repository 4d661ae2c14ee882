//! Batch response types.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::envelope::Envelope;

/// Outcome of one `(entity, data_type)` pair inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemResult {
    Ok(Envelope),
    Failed(ItemFailure),
}

impl ItemResult {
    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            ItemResult::Ok(envelope) => Some(envelope),
            ItemResult::Failed(_) => None,
        }
    }
}

/// A failed batch item. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Machine-readable error kind (e.g. `"budget_exhausted"`).
    pub error: String,
    /// Human-readable explanation.
    pub detail: String,
}

/// Aggregate statistics, always derived from the item outcomes of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Distinct normalized entities in the batch.
    pub total_companies: usize,
    /// Distinct `(entity, data_type)` pairs processed.
    pub total_items: usize,
    /// Items served from cache (`cache`, `cache_expired`, `cache_fallback`).
    pub cache_hits: usize,
    /// Items fetched upstream.
    pub api_calls: usize,
    /// Items whose budget reservation was refused, with or without a fallback.
    pub budget_limited: usize,
    /// Items that produced no data.
    pub failed: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cost: Decimal,
    pub cache_hit_rate: f64,
    pub processing_time_ms: u64,
}

/// Results keyed by normalized entity id, then data type.
pub type BatchResults = BTreeMap<String, BTreeMap<String, ItemResult>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: BatchResults,
    pub summary: BatchSummary,
}

impl BatchResponse {
    /// Look up one item's outcome.
    pub fn get(&self, entity_id: &str, data_type: &str) -> Option<&ItemResult> {
        self.results.get(entity_id)?.get(data_type)
    }
}
