//! Shared fixtures for gateway integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use tollgate::clock::ManualClock;
use tollgate::providers::{DataProvider, ProviderRequest, ProviderResponse};
use tollgate::{
    BudgetConfig, DataTypePolicy, EmbeddedGateway, ProviderSpec, Result, RetryConfig, Tollgate,
    TollgateBuilder, TollgateError,
};

pub const PROVIDER: &str = "openbb";

pub fn cents(n: i64) -> Decimal {
    Decimal::new(n, 2)
}

/// Noon on a weekday, well inside a daily budget window.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap()
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(t0()))
}

/// Provider returning `{"entity", "data_type", "call"}` payloads.
pub struct MockProvider {
    name: &'static str,
    calls: AtomicU32,
    failing: AtomicBool,
    fail_entities: Vec<&'static str>,
    delay: Option<Duration>,
    cost: Option<Decimal>,
    confidence: Option<f64>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            name: PROVIDER,
            calls: AtomicU32::new(0),
            failing: AtomicBool::new(false),
            fail_entities: Vec::new(),
            delay: None,
            cost: None,
            confidence: None,
        }
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn cost(mut self, cost: Decimal) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn fail_for(mut self, entity: &'static str) -> Self {
        self.fail_entities.push(entity);
        self
    }

    /// Make every subsequent call fail with a 503.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst)
            || self.fail_entities.contains(&request.entity_id.as_str())
        {
            return Err(TollgateError::Api {
                status: 503,
                message: "service unavailable".into(),
            });
        }

        let mut response = ProviderResponse::new(json!({
            "entity": request.entity_id,
            "data_type": request.data_type,
            "website": request.website,
            "call": call,
        }));
        if let Some(cost) = self.cost {
            response = response.with_cost(cost);
        }
        if let Some(confidence) = self.confidence {
            response = response.with_confidence(confidence);
        }
        Ok(response)
    }
}

/// Builder for one provider serving `profile` (and `news`) at `cost` per call.
pub fn builder(
    provider: Arc<MockProvider>,
    cap: Decimal,
    cost: Decimal,
    ttl: Duration,
    clock: Arc<ManualClock>,
) -> TollgateBuilder {
    let policy = DataTypePolicy::new(cost, ttl);
    Tollgate::builder()
        .provider(
            ProviderSpec::new(provider, BudgetConfig::daily(cap))
                .data_type("profile", policy.clone())
                .data_type("news", policy),
        )
        .clock(clock)
        .retry(RetryConfig::disabled())
}

/// $1.00 daily cap, $0.30 per call, 60s TTL.
pub fn gateway(provider: Arc<MockProvider>, clock: Arc<ManualClock>) -> EmbeddedGateway {
    builder(provider, Decimal::ONE, cents(30), Duration::from_secs(60), clock)
        .build()
        .unwrap()
}
