//! Caching subsystem.
//!
//! - [`CacheStore`]: latest upstream record per (entity, data type), with
//!   staleness derived at read time so expired records stay available as
//!   fallbacks. See [`store`] module docs.
//! - [`CacheEntry`] / [`CacheKey`]: the stored snapshot and its composite key.

pub mod entry;
pub mod store;

pub use entry::{CacheEntry, CacheKey};
pub use store::{CacheConfig, CacheStats, CacheStore, Lookup};
