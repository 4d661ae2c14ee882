//! Freshness-weighted confidence scoring.
//!
//! A cache entry stores the confidence its provider declared at write time.
//! The score reported to callers decays with the entry's age:
//!
//! ```text
//! score
//!  base ┤●
//!       │  ╲
//!       │    ╲          linear over [0, ttl]
//! floor ┤      ●
//!       │        ╲___   floor * ttl / age past the ttl
//!       └──────┬──────── age
//!             ttl
//! ```
//!
//! Decay is a pure function of `(base, age, ttl)` and is never stored.

use std::time::Duration;

/// Default score a fully-aged entry decays to.
pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.3;

/// Confidence assigned to upstream data when neither the provider nor the
/// data-type policy declares one.
pub const DEFAULT_BASE_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceScorer {
    floor: f64,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_FLOOR)
    }
}

impl ConfidenceScorer {
    /// Create a scorer decaying towards `floor` (clamped to `[0, 1]`).
    pub fn new(floor: f64) -> Self {
        Self {
            floor: clamp_unit(floor),
        }
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Score a value with base confidence `base`, `age` old, valid for `ttl`.
    ///
    /// A base below the floor never increases; a zero TTL counts as
    /// immediately expired.
    pub fn score(&self, base: f64, age: Duration, ttl: Duration) -> f64 {
        let base = clamp_unit(base);
        let floor = self.floor.min(base);

        if ttl.is_zero() {
            return if age.is_zero() { base } else { floor };
        }

        let age_secs = age.as_secs_f64();
        let ttl_secs = ttl.as_secs_f64();
        let score = if age_secs <= ttl_secs {
            base - (base - floor) * (age_secs / ttl_secs)
        } else {
            floor * (ttl_secs / age_secs)
        };
        clamp_unit(score)
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
