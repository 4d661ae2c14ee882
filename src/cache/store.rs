//! The gateway's record store.
//!
//! [`CacheStore`] keeps the latest upstream snapshot per (entity, data type).
//! Unlike a response cache, entries do not disappear when their TTL runs out:
//! an expired record is still the best thing to serve when the budget refuses
//! an upstream call or the provider is down. Staleness is therefore derived
//! on every read from `fetched_at` and `ttl` rather than enforced by the
//! backing cache.
//!
//! # Memory bound
//!
//! The backing moka cache is capacity-bounded with LRU eviction. Eviction
//! only limits memory; it never changes whether a present entry is fresh.
//!
//! # Broader fallback search
//!
//! Successful fetches that carried a website hint register an alias from
//! the normalized website to the entity id. When a request's own key is
//! empty, [`CacheStore::find_fallback`] follows that alias, so a company
//! cached as `acme-corp` can still answer a request for `acme` that names
//! the same website.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};

use super::entry::{CacheEntry, CacheKey};
use crate::clock::Clock;
use crate::types::normalize_website;

/// Configuration for the cache store.
///
/// ```rust
/// # use tollgate::cache::CacheConfig;
/// let config = CacheConfig::new().max_entries(50_000);
/// assert_eq!(config.max_entries, 50_000);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of records kept. Default: 100,000.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached records.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }
}

/// Result of a staleness-aware lookup.
#[derive(Debug, Clone)]
pub enum Lookup {
    Fresh(Arc<CacheEntry>),
    Expired(Arc<CacheEntry>),
    Miss,
}

impl Lookup {
    pub fn entry(&self) -> Option<&Arc<CacheEntry>> {
        match self {
            Lookup::Fresh(entry) | Lookup::Expired(entry) => Some(entry),
            Lookup::Miss => None,
        }
    }
}

/// Aggregate cache statistics for operational dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub expired_entries: u64,
    pub fresh_hits: u64,
    pub expired_hits: u64,
    pub misses: u64,
    pub writes: u64,
    /// `fresh_hits / (fresh_hits + expired_hits + misses)`, 0 when unused.
    pub hit_rate: f64,
}

#[derive(Debug, Default)]
struct Counters {
    fresh_hits: AtomicU64,
    expired_hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

/// Thread-safe store of the latest upstream record per key.
///
/// Writes replace whole entries (`Arc<CacheEntry>`), so concurrent writers
/// for the same key resolve last-writer-wins and readers never observe a
/// partially written record.
pub struct CacheStore {
    entries: Cache<CacheKey, Arc<CacheEntry>>,
    aliases: Cache<String, String>,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl CacheStore {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        let aliases = Cache::builder()
            .max_capacity(config.max_entries)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self {
            entries,
            aliases,
            clock,
            counters: Counters::default(),
        }
    }

    /// Raw lookup. Returns the entry regardless of staleness.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.entries.get(key)
    }

    /// Lookup classified against the current time. Updates hit/miss counters.
    pub fn lookup(&self, key: &CacheKey) -> Lookup {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired(self.clock.now()) => {
                self.counters.expired_hits.fetch_add(1, Ordering::Relaxed);
                Lookup::Expired(entry)
            }
            Some(entry) => {
                self.counters.fresh_hits.fetch_add(1, Ordering::Relaxed);
                Lookup::Fresh(entry)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                Lookup::Miss
            }
        }
    }

    /// Store a freshly fetched value, replacing any previous entry.
    pub fn put(
        &self,
        key: CacheKey,
        value: serde_json::Value,
        ttl: Duration,
        confidence: f64,
    ) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry {
            key: key.clone(),
            value,
            fetched_at: self.clock.now(),
            ttl,
            confidence,
        });
        self.entries.insert(key, Arc::clone(&entry));
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        entry
    }

    /// Remember that `website` belongs to `entity_id`.
    pub fn register_alias(&self, website: &str, entity_id: &str) {
        if let Some(host) = normalize_website(website) {
            self.aliases.insert(host, entity_id.to_string());
        }
    }

    /// Broader fallback search for a key with no entry of its own.
    ///
    /// Follows the website alias to another entity id and returns that
    /// entity's record for the same data type, if any.
    pub fn find_fallback(
        &self,
        entity_id: &str,
        data_type: &str,
        website: Option<&str>,
    ) -> Option<Arc<CacheEntry>> {
        let host = normalize_website(website?)?;
        let aliased = self.aliases.get(&host)?;
        if aliased == entity_id {
            return None;
        }
        self.entries.get(&CacheKey::new(aliased, data_type))
    }

    /// Number of stored records (including expired ones).
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.len();
        let expired_entries = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .count() as u64;

        let fresh_hits = self.counters.fresh_hits.load(Ordering::Relaxed);
        let expired_hits = self.counters.expired_hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let lookups = fresh_hits + expired_hits + misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            fresh_hits as f64 / lookups as f64
        };

        CacheStats {
            entries,
            expired_entries,
            fresh_hits,
            expired_hits,
            misses,
            writes: self.counters.writes.load(Ordering::Relaxed),
            hit_rate,
        }
    }
}
