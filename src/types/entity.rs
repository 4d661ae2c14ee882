//! Entity identifier normalization.
//!
//! Callers address companies and symbols by display name ("Acme Corp"),
//! the gateway keys everything by the normalized form ("acme-corp").

use crate::{Result, TollgateError};

/// Normalize an entity identifier for use as a lookup key.
///
/// Trims surrounding whitespace, lower-cases, and replaces spaces with
/// hyphens. Empty identifiers are rejected.
///
/// ```rust
/// # use tollgate::types::normalize_entity_id;
/// assert_eq!(normalize_entity_id("  Acme Corp ").unwrap(), "acme-corp");
/// ```
pub fn normalize_entity_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TollgateError::InvalidInput(
            "entity identifier must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_lowercase().replace(' ', "-"))
}

/// Reduce a website hint to a bare host for alias matching.
///
/// `https://www.Acme.com/about` and `acme.com` normalize to the same value.
/// Returns `None` for blank input.
pub fn normalize_website(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
