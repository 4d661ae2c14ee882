//! Data-type routing table.
//!
//! Every data type is served by exactly one provider and carries a
//! [`DataTypePolicy`]: the estimated cost used for reservations, the cache
//! TTL, and the confidence assigned when the provider declares none.
//!
//! ```text
//! "profile" ──► Route { provider: openbb,     policy: $0.30, 24h, 0.9 }
//! "price"   ──► Route { provider: coingecko,  policy: $0.02, 60s, 0.95 }
//! "funding" ──► UnknownDataType
//! ```
//!
//! # Retry Wrapping
//!
//! When a [`RetryConfig`] is set, providers are wrapped in
//! [`RetryingDataProvider`] at registration time.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, instrument};

use super::retry::{RetryConfig, RetryingDataProvider};
use super::traits::DataProvider;
use crate::budget::BudgetConfig;
use crate::confidence::DEFAULT_BASE_CONFIDENCE;
use crate::{Result, TollgateError};

/// Per data type cost, freshness and confidence settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTypePolicy {
    /// Cost reserved before each upstream call.
    pub estimated_cost: Decimal,
    /// How long a fetched value counts as fresh.
    pub ttl: Duration,
    /// Confidence given to fresh values when the provider reports none.
    pub default_confidence: f64,
}

impl DataTypePolicy {
    pub fn new(estimated_cost: Decimal, ttl: Duration) -> Self {
        Self {
            estimated_cost,
            ttl,
            default_confidence: DEFAULT_BASE_CONFIDENCE,
        }
    }

    pub fn default_confidence(mut self, confidence: f64) -> Self {
        self.default_confidence = confidence;
        self
    }
}

/// A provider together with its budget and the data types it serves.
///
/// ```rust,ignore
/// let spec = ProviderSpec::new(Arc::new(openbb), BudgetConfig::daily(Decimal::ONE))
///     .data_type("profile", DataTypePolicy::new(Decimal::new(30, 2), Duration::from_secs(86_400)));
/// ```
pub struct ProviderSpec {
    pub provider: Arc<dyn DataProvider>,
    pub budget: BudgetConfig,
    pub data_types: Vec<(String, DataTypePolicy)>,
}

impl ProviderSpec {
    pub fn new(provider: Arc<dyn DataProvider>, budget: BudgetConfig) -> Self {
        Self {
            provider,
            budget,
            data_types: Vec::new(),
        }
    }

    pub fn data_type(mut self, name: impl Into<String>, policy: DataTypePolicy) -> Self {
        self.data_types.push((name.into(), policy));
        self
    }
}

/// The provider and policy for one data type.
#[derive(Clone)]
pub struct Route {
    pub provider: Arc<dyn DataProvider>,
    pub policy: DataTypePolicy,
}

impl Route {
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("provider", &self.provider.name())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Registry mapping data types to providers.
#[derive(Default)]
pub struct ProviderRegistry {
    routes: BTreeMap<String, Route>,
    providers: HashSet<String>,
    retry_config: Option<RetryConfig>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap providers registered after this call in [`RetryingDataProvider`].
    pub fn set_retry_config(&mut self, config: RetryConfig) {
        self.retry_config = Some(config);
    }

    /// Route every data type of `spec` to its provider.
    ///
    /// Fails without registering anything when the provider name or one of
    /// its data types is already taken, or when a policy is invalid.
    #[instrument(skip_all, fields(provider = %spec.provider.name()))]
    pub fn register(&mut self, spec: &ProviderSpec) -> Result<()> {
        let name = spec.provider.name().to_string();
        if name.trim().is_empty() {
            return Err(TollgateError::Configuration("provider name must not be empty".into()));
        }
        if self.providers.contains(&name) {
            return Err(TollgateError::Configuration(format!(
                "provider '{name}' registered twice"
            )));
        }
        if spec.data_types.is_empty() {
            return Err(TollgateError::Configuration(format!(
                "provider '{name}' serves no data types"
            )));
        }

        let mut seen = HashSet::new();
        for (data_type, policy) in &spec.data_types {
            validate_policy(data_type, policy)?;
            if self.routes.contains_key(data_type) || !seen.insert(data_type.as_str()) {
                return Err(TollgateError::Configuration(format!(
                    "data type '{data_type}' is already served by another provider"
                )));
            }
        }

        let provider: Arc<dyn DataProvider> = match &self.retry_config {
            Some(config) if config.max_attempts > 1 => {
                Arc::new(RetryingDataProvider::new(spec.provider.clone(), config.clone()))
            }
            _ => spec.provider.clone(),
        };

        for (data_type, policy) in &spec.data_types {
            debug!(data_type, cost = %policy.estimated_cost, ttl_secs = policy.ttl.as_secs(), "route registered");
            self.routes.insert(
                data_type.clone(),
                Route {
                    provider: provider.clone(),
                    policy: policy.clone(),
                },
            );
        }
        self.providers.insert(name);
        Ok(())
    }

    /// The route for `data_type`.
    pub fn route(&self, data_type: &str) -> Result<&Route> {
        self.routes
            .get(data_type)
            .ok_or_else(|| TollgateError::UnknownDataType(data_type.to_string()))
    }

    /// Registered data types, sorted.
    pub fn data_types(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

fn validate_policy(data_type: &str, policy: &DataTypePolicy) -> Result<()> {
    if data_type.trim().is_empty() {
        return Err(TollgateError::Configuration("data type name must not be empty".into()));
    }
    if policy.estimated_cost.is_sign_negative() {
        return Err(TollgateError::Configuration(format!(
            "estimated cost for '{data_type}' must not be negative"
        )));
    }
    if !(0.0..=1.0).contains(&policy.default_confidence) {
        return Err(TollgateError::Configuration(format!(
            "default confidence for '{data_type}' must be within [0, 1]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::traits::{ProviderRequest, ProviderResponse};
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl DataProvider for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn fetch(&self, _request: &ProviderRequest) -> Result<ProviderResponse> {
            Ok(ProviderResponse::new(serde_json::json!({})))
        }
    }

    fn policy() -> DataTypePolicy {
        DataTypePolicy::new(Decimal::new(30, 2), Duration::from_secs(60))
    }

    fn spec(name: &'static str, types: &[&str]) -> ProviderSpec {
        types.iter().fold(
            ProviderSpec::new(Arc::new(Named(name)), BudgetConfig::daily(Decimal::ONE)),
            |spec, t| spec.data_type(*t, policy()),
        )
    }

    #[test]
    fn routes_each_data_type() {
        let mut registry = ProviderRegistry::new();
        registry.register(&spec("a", &["profile", "news"])).unwrap();
        registry.register(&spec("b", &["price"])).unwrap();

        assert_eq!(registry.route("price").unwrap().provider_name(), "b");
        assert_eq!(registry.route("news").unwrap().provider_name(), "a");
        assert_eq!(registry.data_types(), vec!["news", "price", "profile"]);
    }

    #[test]
    fn unknown_data_type() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.route("funding"),
            Err(TollgateError::UnknownDataType(t)) if t == "funding"
        ));
    }

    #[test]
    fn duplicate_data_type_rejected_atomically() {
        let mut registry = ProviderRegistry::new();
        registry.register(&spec("a", &["profile"])).unwrap();
        let err = registry.register(&spec("b", &["news", "profile"])).unwrap_err();
        assert!(matches!(err, TollgateError::Configuration(_)));
        assert!(registry.route("news").is_err());
    }

    #[test]
    fn duplicate_provider_rejected() {
        let mut registry = ProviderRegistry::new();
        registry.register(&spec("a", &["profile"])).unwrap();
        assert!(registry.register(&spec("a", &["price"])).is_err());
    }

    #[test]
    fn invalid_policy_rejected() {
        let mut registry = ProviderRegistry::new();
        let bad = ProviderSpec::new(Arc::new(Named("a")), BudgetConfig::daily(Decimal::ONE))
            .data_type("profile", policy().default_confidence(1.5));
        assert!(registry.register(&bad).is_err());
    }
}
