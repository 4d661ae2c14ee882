//! Telemetry metric name constants.
//!
//! Centralised metric names for tollgate operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `tollgate_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: upstream provider name (e.g. "coingecko", "openbb")
//! - `data_type`: requested data type tag (e.g. "profile", "price")
//! - `status`: outcome: "ok" or "error"

/// Cache lookups performed by the orchestrator.
///
/// Labels: `data_type`, `result` ("fresh" | "expired" | "miss").
pub const CACHE_LOOKUPS_TOTAL: &str = "tollgate_cache_lookups_total";

/// Upstream provider calls (one per reservation, retries not included).
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const UPSTREAM_REQUESTS_TOTAL: &str = "tollgate_upstream_requests_total";

/// Upstream call duration in seconds, including retries.
///
/// Labels: `provider`.
pub const UPSTREAM_DURATION_SECONDS: &str = "tollgate_upstream_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`.
pub const RETRIES_TOTAL: &str = "tollgate_retries_total";

/// Reservations refused because the provider's cap was reached.
///
/// Labels: `provider`.
pub const BUDGET_DENIALS_TOTAL: &str = "tollgate_budget_denials_total";

/// Spend recorded against the current period, in the provider's currency.
///
/// Labels: `provider`.
pub const BUDGET_SPENT: &str = "tollgate_budget_spent";

/// Requests answered from cache after the upstream path was refused or failed.
///
/// Labels: `reason` ("budget" | "upstream").
pub const FALLBACKS_TOTAL: &str = "tollgate_fallbacks_total";
