//! The uniform response envelope and its provenance tag.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where the data in an [`Envelope`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Fresh cache entry (within its TTL).
    Cache,
    /// Fetched from the upstream provider for this request.
    Api,
    /// Cached record served because the upstream call failed, or found by
    /// the broader fallback search when the request's own key had no entry.
    CacheFallback,
    /// Expired cache entry served because the budget refused an upstream call.
    CacheExpired,
}

impl Source {
    /// Whether the data was served from the cache store.
    pub fn is_cached(self) -> bool {
        match self {
            Source::Cache | Source::CacheFallback | Source::CacheExpired => true,
            Source::Api => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Cache => "cache",
            Source::Api => "api",
            Source::CacheFallback => "cache_fallback",
            Source::CacheExpired => "cache_expired",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data plus provenance metadata, returned for every successful fetch.
///
/// `source != Api` is a freshness hint for the caller, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub data: serde_json::Value,
    pub source: Source,
    pub cached: bool,
    /// Cost charged for this request (zero for anything served from cache).
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub cost: Option<Decimal>,
    /// Seconds until the underlying record expires, computed at response time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_serializes_snake_case() {
        let json = serde_json::to_string(&Source::CacheExpired).unwrap();
        assert_eq!(json, "\"cache_expired\"");
        let parsed: Source = serde_json::from_str("\"cache_fallback\"").unwrap();
        assert_eq!(parsed, Source::CacheFallback);
    }

    #[test]
    fn only_api_is_uncached() {
        assert!(Source::Cache.is_cached());
        assert!(Source::CacheExpired.is_cached());
        assert!(Source::CacheFallback.is_cached());
        assert!(!Source::Api.is_cached());
    }

    #[test]
    fn envelope_cost_is_a_json_number() {
        let envelope = Envelope {
            data: serde_json::json!({"price": 1}),
            source: Source::Api,
            cached: false,
            cost: Some(Decimal::new(30, 2)),
            expires_in: Some(60),
            confidence_score: Some(0.9),
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["cost"], serde_json::json!(0.3));
        assert_eq!(value["source"], "api");
        assert_eq!(value["expires_in"], 60);
    }
}
