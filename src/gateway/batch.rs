//! Batch fetch coordination.
//!
//! A batch is planned sequentially in input order: each item's cache
//! decision and budget reservation is made before the next item is looked
//! at, so the same ledger state and the same request always produce the
//! same cache/api/budget split.
//!
//! Every granted call is spawned as soon as planning finishes, before the
//! batch first yields. A semaphore bounds how many reach their provider at
//! once. Each spawned task owns its reservation and settles it, so a batch
//! dropped mid-flight (e.g. a disconnected HTTP client) still delivers,
//! caches and pays for exactly the calls it reserved.
//!
//! Reservations are held at the estimated cost until each call settles.
//! When a provider reports an actual cost below its estimate, the
//! difference returns to the ledger only after that call completes, so it
//! is not available to later items of the same batch even though a
//! sequence of single fetches could have used it. Planning all items
//! against estimates keeps the split independent of upstream timing.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures_util::future;
use rust_decimal::Decimal;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};

use super::orchestrator::{FetchOrchestrator, FetchTarget, Outcome, PendingUpstream, Plan};
use crate::TollgateError;
use crate::types::{
    BatchRequest, BatchResponse, BatchResults, BatchSummary, ItemFailure, ItemResult, Source,
    normalize_entity_id,
};

/// Default number of upstream calls a batch runs at once.
pub const DEFAULT_MAX_CONCURRENT_UPSTREAM: usize = 8;

struct PlannedItem {
    entity_id: String,
    data_type: String,
    plan: Plan,
}

enum Item {
    Done(Outcome),
    Running(PendingUpstream),
}

pub(crate) struct BatchCoordinator {
    orchestrator: FetchOrchestrator,
    max_concurrent: usize,
}

impl BatchCoordinator {
    pub fn new(orchestrator: FetchOrchestrator, max_concurrent: usize) -> Self {
        Self {
            orchestrator,
            max_concurrent: max_concurrent.max(1),
        }
    }

    #[instrument(skip_all, fields(companies = request.companies.len()))]
    pub async fn run(&self, request: &BatchRequest) -> BatchResponse {
        let started = Instant::now();
        let (planned, companies) = self.plan_all(request);
        let total_items = planned.len();

        // Spawn before the first await so no reservation depends on this
        // future being polled.
        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let items: Vec<(String, String, Item)> = planned
            .into_iter()
            .map(|planned| {
                let item = match planned.plan {
                    Plan::Done(outcome) => Item::Done(outcome),
                    Plan::Upstream(call) => Item::Running(
                        self.orchestrator.spawn(call, Some(Arc::clone(&permits))),
                    ),
                };
                (planned.entity_id, planned.data_type, item)
            })
            .collect();

        let outcomes: Vec<(String, String, Outcome)> =
            future::join_all(items.into_iter().map(|(entity_id, data_type, item)| async move {
                let outcome = match item {
                    Item::Done(outcome) => outcome,
                    Item::Running(pending) => pending.join().await,
                };
                (entity_id, data_type, outcome)
            }))
            .await;

        let mut summary = BatchSummary {
            total_companies: companies,
            total_items,
            cache_hits: 0,
            api_calls: 0,
            budget_limited: 0,
            failed: 0,
            total_cost: Decimal::ZERO,
            cache_hit_rate: 0.0,
            processing_time_ms: 0,
        };
        let mut results = BatchResults::new();

        for (entity_id, data_type, outcome) in outcomes {
            if outcome.budget_limited {
                summary.budget_limited += 1;
            }
            let item = match outcome.result {
                Ok(envelope) => {
                    match envelope.source {
                        Source::Api => summary.api_calls += 1,
                        Source::Cache | Source::CacheExpired | Source::CacheFallback => {
                            summary.cache_hits += 1
                        }
                    }
                    summary.total_cost += envelope.cost.unwrap_or_default();
                    ItemResult::Ok(envelope)
                }
                Err(e) => {
                    summary.failed += 1;
                    ItemResult::Failed(ItemFailure {
                        error: e.kind().to_string(),
                        detail: e.to_string(),
                    })
                }
            };
            results.entry(entity_id).or_default().insert(data_type, item);
        }

        if total_items > 0 {
            summary.cache_hit_rate = summary.cache_hits as f64 / total_items as f64;
        }
        summary.processing_time_ms = started.elapsed().as_millis() as u64;

        info!(
            items = summary.total_items,
            cache_hits = summary.cache_hits,
            api_calls = summary.api_calls,
            budget_limited = summary.budget_limited,
            failed = summary.failed,
            total_cost = %summary.total_cost,
            "batch complete"
        );
        BatchResponse { results, summary }
    }

    /// Plan every distinct item in input order. Returns the plans and the
    /// number of distinct entities.
    fn plan_all(&self, request: &BatchRequest) -> (Vec<PlannedItem>, usize) {
        let mut planned = Vec::new();
        let mut seen = HashSet::new();
        let mut entities = BTreeSet::new();

        for (entity, data_types) in request.items() {
            let entity_id = match normalize_entity_id(&entity.name) {
                Ok(id) => id,
                Err(e) => {
                    // Nothing to normalize, so report under the name as given.
                    let detail = match e {
                        TollgateError::InvalidInput(detail) => detail,
                        other => other.to_string(),
                    };
                    let raw = entity.name.clone();
                    entities.insert(raw.clone());
                    for data_type in data_types {
                        let data_type = data_type.trim();
                        if seen.insert((raw.clone(), data_type.to_string())) {
                            planned.push(PlannedItem {
                                entity_id: raw.clone(),
                                data_type: data_type.to_string(),
                                plan: Plan::Done(Outcome::failed(
                                    TollgateError::InvalidInput(detail.clone()),
                                )),
                            });
                        }
                    }
                    continue;
                }
            };
            entities.insert(entity_id.clone());

            for data_type in data_types {
                // Keyed the way the cache keys it.
                let data_type = data_type.trim();
                if !seen.insert((entity_id.clone(), data_type.to_string())) {
                    debug!(%entity_id, %data_type, "skipping duplicate batch item");
                    continue;
                }
                let plan = FetchTarget::new(
                    &entity_id,
                    data_type,
                    entity.website.as_deref(),
                    request.force_refresh,
                )
                .and_then(|target| self.orchestrator.plan(&target))
                .unwrap_or_else(|e| Plan::Done(Outcome::failed(e)));

                planned.push(PlannedItem {
                    entity_id: entity_id.clone(),
                    data_type: data_type.to_string(),
                    plan,
                });
            }
        }
        (planned, entities.len())
    }
}
