//! Single-request decision flow.
//!
//! ```text
//!                     lookup(key)
//!                         │
//!        fresh && !force ─┼──────────────────────────────► cache
//!                         ▼
//!                  try_reserve(provider, estimate)
//!          denied │                       │ granted
//!                 ▼                       ▼
//!   own entry? ── fresh ─► cache     spawn { timeout(provider.fetch) }
//!             └── expired ─► cache_expired     │ ok                 │ err
//!   alias entry? ─► cache_fallback             ▼                    ▼
//!   nothing ─► BudgetExhausted       put + commit(actual)    commit(0)
//!                                    ─► api                  own/alias entry ─► cache_fallback
//!                                                            nothing ─► UpstreamFailure
//! ```
//!
//! Deciding ([`FetchOrchestrator::plan`]) is synchronous and cheap, so a
//! batch can make all reservation decisions in input order before any
//! upstream call runs ([`FetchOrchestrator::execute`]).

use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::budget::{BudgetLedger, Reservation};
use crate::cache::{CacheEntry, CacheKey, CacheStore, Lookup};
use crate::clock::Clock;
use crate::confidence::ConfidenceScorer;
use crate::providers::{ProviderRegistry, ProviderRequest, Route};
use crate::telemetry;
use crate::types::{DataRequest, Envelope, Source, normalize_entity_id};
use crate::{Result, TollgateError};

/// A normalized single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchTarget {
    pub key: CacheKey,
    pub website: Option<String>,
    pub force_refresh: bool,
}

impl FetchTarget {
    pub fn new(
        entity_id: &str,
        data_type: &str,
        website: Option<&str>,
        force_refresh: bool,
    ) -> Result<Self> {
        let entity_id = normalize_entity_id(entity_id)?;
        let data_type = data_type.trim();
        if data_type.is_empty() {
            return Err(TollgateError::InvalidInput("data type must not be empty".into()));
        }
        Ok(Self {
            key: CacheKey::new(entity_id, data_type),
            website: website
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(str::to_string),
            force_refresh,
        })
    }

    pub fn from_request(request: &DataRequest) -> Result<Self> {
        Self::new(
            &request.entity_id,
            &request.data_type,
            request.website.as_deref(),
            request.force_refresh,
        )
    }
}

/// Final result of one fetch, plus whether the budget refused it.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub result: Result<Envelope>,
    pub budget_limited: bool,
}

impl Outcome {
    fn served(envelope: Envelope) -> Self {
        Self {
            result: Ok(envelope),
            budget_limited: false,
        }
    }

    pub fn failed(error: TollgateError) -> Self {
        Self {
            result: Err(error),
            budget_limited: false,
        }
    }
}

/// An upstream call already running on its own task.
pub(crate) struct PendingUpstream {
    provider: String,
    handle: JoinHandle<Outcome>,
}

impl PendingUpstream {
    /// Wait for the call to settle.
    pub async fn join(self) -> Outcome {
        let provider = self.provider;
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%provider, error = %e, "upstream task aborted");
                Outcome::failed(TollgateError::Internal(format!(
                    "upstream task for '{provider}' aborted: {e}"
                )))
            }
        }
    }
}

/// A granted reservation waiting for its upstream call.
#[derive(Debug)]
pub(crate) struct UpstreamCall {
    target: FetchTarget,
    route: Route,
    reservation: Reservation,
}

#[derive(Debug)]
pub(crate) enum Plan {
    /// Answered without contacting the provider.
    Done(Outcome),
    Upstream(UpstreamCall),
}

/// Decides cache vs upstream vs fallback for one request.
#[derive(Clone)]
pub(crate) struct FetchOrchestrator {
    cache: Arc<CacheStore>,
    ledger: Arc<BudgetLedger>,
    registry: Arc<ProviderRegistry>,
    scorer: ConfidenceScorer,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl FetchOrchestrator {
    pub fn new(
        cache: Arc<CacheStore>,
        ledger: Arc<BudgetLedger>,
        registry: Arc<ProviderRegistry>,
        scorer: ConfidenceScorer,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            cache,
            ledger,
            registry,
            scorer,
            clock,
            timeout,
        }
    }

    /// Plan and execute one request.
    #[instrument(skip_all, fields(entity = %request.entity_id, data_type = %request.data_type))]
    pub async fn fetch(&self, request: &DataRequest) -> Result<Envelope> {
        let target = FetchTarget::from_request(request)?;
        match self.plan(&target)? {
            Plan::Done(outcome) => outcome.result,
            Plan::Upstream(call) => self.execute(call).await.result,
        }
    }

    /// Make the cache/budget decision for `target`. Never contacts a provider.
    pub fn plan(&self, target: &FetchTarget) -> Result<Plan> {
        let route = self.registry.route(&target.key.data_type)?.clone();
        let lookup = self.cache.lookup(&target.key);
        record_lookup(&target.key.data_type, &lookup);

        if !target.force_refresh
            && let Lookup::Fresh(entry) = &lookup
        {
            debug!(key = %target.key, "fresh cache hit");
            return Ok(Plan::Done(Outcome::served(
                self.cached_envelope(entry, Source::Cache),
            )));
        }

        let provider = route.provider_name().to_string();
        match self
            .ledger
            .try_reserve(&provider, route.policy.estimated_cost)?
        {
            Some(reservation) => {
                debug!(key = %target.key, %provider, "reservation granted, going upstream");
                Ok(Plan::Upstream(UpstreamCall {
                    target: target.clone(),
                    route,
                    reservation,
                }))
            }
            None => Ok(Plan::Done(self.budget_denied(target, &provider, lookup))),
        }
    }

    /// Run a granted upstream call to completion.
    ///
    /// The call, cache write and cost commit run on a spawned task, so
    /// dropping the returned future does not lose a paid-for result.
    pub async fn execute(&self, call: UpstreamCall) -> Outcome {
        self.spawn(call, None).join().await
    }

    /// Start a granted upstream call on its own task.
    ///
    /// The task owns the reservation and settles it whether or not anyone
    /// joins it. With `permits`, the task waits for a permit before calling
    /// the provider and holds it until the call settles.
    pub fn spawn(&self, call: UpstreamCall, permits: Option<Arc<Semaphore>>) -> PendingUpstream {
        let this = self.clone();
        let provider = call.route.provider_name().to_string();
        let handle = tokio::spawn(async move {
            let _permit = match permits {
                Some(permits) => permits.acquire_owned().await.ok(),
                None => None,
            };
            this.run_upstream(call).await
        });
        PendingUpstream { provider, handle }
    }

    async fn run_upstream(&self, call: UpstreamCall) -> Outcome {
        let UpstreamCall {
            target,
            route,
            reservation,
        } = call;
        let provider = route.provider_name().to_string();
        let request = ProviderRequest::new(&target.key.entity_id, &target.key.data_type)
            .website(target.website.clone());

        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, route.provider.fetch(&request)).await
        {
            Ok(result) => result,
            Err(_) => Err(TollgateError::Timeout(self.timeout)),
        };
        metrics::histogram!(telemetry::UPSTREAM_DURATION_SECONDS, "provider" => provider.clone())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                metrics::counter!(telemetry::UPSTREAM_REQUESTS_TOTAL,
                    "provider" => provider.clone(),
                    "status" => "ok",
                )
                .increment(1);

                let policy = &route.policy;
                let confidence = response
                    .confidence
                    .unwrap_or(policy.default_confidence);
                let cost = response
                    .cost
                    .unwrap_or(policy.estimated_cost)
                    .max(Decimal::ZERO);

                let entry = self
                    .cache
                    .put(target.key.clone(), response.data, policy.ttl, confidence);
                if let Some(website) = &target.website {
                    self.cache.register_alias(website, &target.key.entity_id);
                }
                if let Err(e) = self.ledger.commit(reservation, cost) {
                    error!(%provider, error = %e, "failed to commit upstream cost");
                }

                debug!(key = %target.key, %provider, %cost, "fetched upstream");
                Outcome::served(Envelope {
                    data: entry.value.clone(),
                    source: Source::Api,
                    cached: false,
                    cost: Some(cost),
                    expires_in: Some(policy.ttl.as_secs()),
                    confidence_score: Some(self.scorer.score(
                        confidence,
                        Duration::ZERO,
                        policy.ttl,
                    )),
                })
            }
            Err(err) => {
                metrics::counter!(telemetry::UPSTREAM_REQUESTS_TOTAL,
                    "provider" => provider.clone(),
                    "status" => "error",
                )
                .increment(1);
                warn!(key = %target.key, %provider, error = %err, "upstream fetch failed");

                if let Err(e) = self.ledger.release(reservation) {
                    error!(%provider, error = %e, "failed to release reservation");
                }

                match self.any_cached(&target) {
                    Some(entry) => {
                        metrics::counter!(telemetry::FALLBACKS_TOTAL, "reason" => "upstream")
                            .increment(1);
                        Outcome::served(self.cached_envelope(&entry, Source::CacheFallback))
                    }
                    None => Outcome::failed(TollgateError::UpstreamFailure {
                        provider,
                        source: Box::new(err),
                    }),
                }
            }
        }
    }

    fn budget_denied(&self, target: &FetchTarget, provider: &str, lookup: Lookup) -> Outcome {
        let envelope = match lookup {
            Lookup::Fresh(entry) => Some(self.cached_envelope(&entry, Source::Cache)),
            Lookup::Expired(entry) => Some(self.cached_envelope(&entry, Source::CacheExpired)),
            Lookup::Miss => self
                .broader_fallback(target)
                .map(|entry| self.cached_envelope(&entry, Source::CacheFallback)),
        };

        let result = match envelope {
            Some(envelope) => {
                metrics::counter!(telemetry::FALLBACKS_TOTAL, "reason" => "budget").increment(1);
                debug!(key = %target.key, source = %envelope.source, "budget denied, serving cache");
                Ok(envelope)
            }
            None => Err(TollgateError::BudgetExhausted {
                provider: provider.to_string(),
                entity: target.key.entity_id.clone(),
                data_type: target.key.data_type.clone(),
            }),
        };
        Outcome {
            result,
            budget_limited: true,
        }
    }

    /// Own entry in any state, then the broader alias search.
    fn any_cached(&self, target: &FetchTarget) -> Option<Arc<CacheEntry>> {
        self.cache
            .get(&target.key)
            .or_else(|| self.broader_fallback(target))
    }

    fn broader_fallback(&self, target: &FetchTarget) -> Option<Arc<CacheEntry>> {
        self.cache.find_fallback(
            &target.key.entity_id,
            &target.key.data_type,
            target.website.as_deref(),
        )
    }

    fn cached_envelope(&self, entry: &CacheEntry, source: Source) -> Envelope {
        let now = self.clock.now();
        Envelope {
            data: entry.value.clone(),
            source,
            cached: true,
            cost: Some(Decimal::ZERO),
            expires_in: Some(entry.expires_in(now).as_secs()),
            confidence_score: Some(self.scorer.score(entry.confidence, entry.age(now), entry.ttl)),
        }
    }
}

fn record_lookup(data_type: &str, lookup: &Lookup) {
    let result = match lookup {
        Lookup::Fresh(_) => "fresh",
        Lookup::Expired(_) => "expired",
        Lookup::Miss => "miss",
    };
    metrics::counter!(telemetry::CACHE_LOOKUPS_TOTAL,
        "data_type" => data_type.to_owned(),
        "result" => result,
    )
    .increment(1);
}
