//! [`GatewayClient`]: [`DataGateway`] implementation that talks to tolld over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, IntoUrl, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::budget::BudgetStatus;
use crate::cache::CacheStats;
use crate::types::{BatchRequest, BatchResponse, DataRequest, Envelope};
use crate::version::user_agent;
use crate::{DataGateway, Result, TollgateError};

/// `GET /health` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
}

/// Error body returned by tolld for non-2xx responses.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    detail: String,
}

/// A [`DataGateway`] client for a remote tolld server.
///
/// Server-side errors come back as [`TollgateError::Api`] carrying the HTTP
/// status and the server's `detail` message.
#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
}

impl GatewayClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:9742`).
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = GatewayClient::new("http://127.0.0.1:9742")?;
    /// ```
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(user_agent())
            .build()
            .map_err(|e| TollgateError::Configuration(format!("failed to build HTTP client: {e}")))?;
        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn health(&self) -> Result<Health> {
        self.get("/health").await
    }

    /// `{base_url}{path}/{segment}`, with `segment` percent-encoded.
    fn url_with_segment(&self, path: &str, segment: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{path}", self.base_url))
            .map_err(|e| TollgateError::Configuration(format!("invalid tolld address: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| TollgateError::Configuration(format!("invalid tolld address: {}", self.base_url)))?
            .push(segment);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_url(format!("{}{path}", self.base_url)).await
    }

    async fn get_url<T: DeserializeOwned>(&self, url: impl IntoUrl) -> Result<T> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TollgateError::Http(format!("failed to reach {}: {e}", self.base_url)))?;
        decode(response).await
    }

    async fn post<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| TollgateError::Http(format!("failed to reach {}: {e}", self.base_url)))?;
        decode(response).await
    }
}

/// Decode a success body, or map an error body to [`TollgateError::Api`].
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| TollgateError::Http(e.to_string()))?;

    if status.is_success() {
        return Ok(serde_json::from_slice(&bytes)?);
    }

    let message = match serde_json::from_slice::<ErrorBody>(&bytes) {
        Ok(body) => format!("{}: {}", body.error, body.detail),
        Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
    };
    Err(TollgateError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DataGateway for GatewayClient {
    async fn fetch(&self, request: &DataRequest) -> Result<Envelope> {
        self.post("/v1/data", request).await
    }

    async fn batch(&self, request: &BatchRequest) -> Result<BatchResponse> {
        self.post("/v1/batch", request).await
    }

    async fn budget_status(&self, provider: &str) -> Result<BudgetStatus> {
        self.get_url(self.url_with_segment("/v1/budget", provider)?).await
    }

    async fn budget_statuses(&self) -> Result<Vec<BudgetStatus>> {
        self.get("/v1/budget").await
    }

    async fn cache_stats(&self) -> Result<CacheStats> {
        self.get("/v1/cache/stats").await
    }

    fn name(&self) -> &str {
        "tolld"
    }
}
