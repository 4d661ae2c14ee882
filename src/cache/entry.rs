//! Cache keys and entries.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Composite cache key: normalized entity id plus data-type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub entity_id: String,
    pub data_type: String,
}

impl CacheKey {
    /// Build a key from an already-normalized entity id.
    pub fn new(entity_id: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            data_type: data_type.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_id, self.data_type)
    }
}

/// A snapshot of one upstream fetch.
///
/// Entries are immutable; a newer fetch replaces the whole entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub value: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
    pub ttl: Duration,
    /// Confidence declared at write time; decay is applied on read.
    pub confidence: f64,
}

impl CacheEntry {
    /// Time elapsed since the fetch. Never negative, even if the clock moved back.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// `now - fetched_at > ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > self.ttl
    }

    /// `max(0, ttl - age)`.
    pub fn expires_in(&self, now: DateTime<Utc>) -> Duration {
        self.ttl.saturating_sub(self.age(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry_at(fetched_at: DateTime<Utc>, ttl_secs: u64) -> CacheEntry {
        CacheEntry {
            key: CacheKey::new("acme", "profile"),
            value: serde_json::json!({}),
            fetched_at,
            ttl: Duration::from_secs(ttl_secs),
            confidence: 0.9,
        }
    }

    #[test]
    fn expiry_is_strictly_after_ttl() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let entry = entry_at(t0, 60);
        assert!(!entry.is_expired(t0 + chrono::Duration::seconds(59)));
        assert!(!entry.is_expired(t0 + chrono::Duration::seconds(60)));
        assert!(entry.is_expired(t0 + chrono::Duration::seconds(61)));
    }

    #[test]
    fn expires_in_saturates_at_zero() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let entry = entry_at(t0, 60);
        assert_eq!(
            entry.expires_in(t0 + chrono::Duration::seconds(20)),
            Duration::from_secs(40)
        );
        assert_eq!(
            entry.expires_in(t0 + chrono::Duration::seconds(600)),
            Duration::ZERO
        );
    }

    #[test]
    fn clock_skew_reads_as_fresh() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let entry = entry_at(t0, 60);
        assert_eq!(entry.age(t0 - chrono::Duration::seconds(5)), Duration::ZERO);
    }
}
