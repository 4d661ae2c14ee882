//! Generic HTTP/JSON data provider.
//!
//! Speaks a minimal REST convention:
//!
//! ```text
//! GET {base_url}/{data_type}?entity={entity_id}[&website={website}]
//! Authorization: Bearer {api_key}
//!
//! 200 OK
//! x-request-cost: 0.30        (optional, actual cost)
//! x-confidence: 0.85          (optional)
//! { ...payload... }
//! ```

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

use super::traits::{DataProvider, ProviderRequest, ProviderResponse};
use crate::version::user_agent;
use crate::{Result, TollgateError};

/// Header carrying the actual cost of a call.
pub const COST_HEADER: &str = "x-request-cost";

/// Header carrying the provider's confidence in the payload.
pub const CONFIDENCE_HEADER: &str = "x-confidence";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for a REST data provider.
#[derive(Clone)]
pub struct HttpDataProvider {
    name: String,
    api_key: Option<String>,
    http: Client,
    base_url: String,
}

impl HttpDataProvider {
    /// Create a provider rooted at `base_url`.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(user_agent())
            .build()
            .map_err(|e| TollgateError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(name, base_url, http))
    }

    /// Create a provider on a caller-supplied client.
    pub fn with_client(name: impl Into<String>, base_url: impl Into<String>, http: Client) -> Self {
        let base_url: String = base_url.into();
        Self {
            name: name.into(),
            api_key: None,
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send `Authorization: Bearer {key}` on every request.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check response status and map to the matching error.
    fn handle_response_errors(&self, response: &reqwest::Response) -> Result<()> {
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            401 | 403 => Err(TollgateError::AuthenticationFailed),
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(TollgateError::RateLimited { retry_after })
            }
            code => Err(TollgateError::Api {
                status: code,
                message: format!("{} returned {}", self.name, status),
            }),
        }
    }
}

#[async_trait]
impl DataProvider for HttpDataProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let url = format!("{}/{}", self.base_url, request.data_type);
        let mut query = vec![("entity", request.entity_id.as_str())];
        if let Some(website) = request.website.as_deref() {
            query.push(("website", website));
        }

        let mut builder = self.http.get(&url).query(&query);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TollgateError::Http(e.to_string()))?;

        self.handle_response_errors(&response)?;

        let cost = parse_cost(response.headers(), &self.name);
        let confidence = parse_confidence(response.headers());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TollgateError::Http(e.to_string()))?;
        if bytes.is_empty() {
            return Err(TollgateError::EmptyResponse);
        }
        let data: Value = serde_json::from_slice(&bytes)?;
        if data.is_null() {
            return Err(TollgateError::EmptyResponse);
        }

        debug!(provider = %self.name, data_type = %request.data_type, ?cost, "provider responded");
        Ok(ProviderResponse {
            data,
            cost,
            confidence,
        })
    }
}

fn parse_cost(headers: &HeaderMap, provider: &str) -> Option<Decimal> {
    let raw = headers.get(COST_HEADER)?.to_str().ok()?.trim();
    match Decimal::from_str(raw) {
        Ok(cost) if !cost.is_sign_negative() => Some(cost),
        _ => {
            warn!(provider, value = raw, "ignoring malformed cost header");
            None
        }
    }
}

fn parse_confidence(headers: &HeaderMap) -> Option<f64> {
    headers
        .get(CONFIDENCE_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|c| (0.0..=1.0).contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = HttpDataProvider::new("p", "http://localhost:1/api/").unwrap();
        assert_eq!(provider.base_url(), "http://localhost:1/api");
    }

    #[test]
    fn cost_header_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(COST_HEADER, HeaderValue::from_static("0.30"));
        assert_eq!(parse_cost(&headers, "p"), Some(Decimal::new(30, 2)));

        headers.insert(COST_HEADER, HeaderValue::from_static("-1"));
        assert_eq!(parse_cost(&headers, "p"), None);

        headers.insert(COST_HEADER, HeaderValue::from_static("abc"));
        assert_eq!(parse_cost(&headers, "p"), None);
    }

    #[test]
    fn confidence_header_must_be_in_unit_range() {
        let mut headers = HeaderMap::new();
        headers.insert(CONFIDENCE_HEADER, HeaderValue::from_static("0.8"));
        assert_eq!(parse_confidence(&headers), Some(0.8));

        headers.insert(CONFIDENCE_HEADER, HeaderValue::from_static("1.2"));
        assert_eq!(parse_confidence(&headers), None);
    }
}
