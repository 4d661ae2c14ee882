//! Tollgate error types

use std::time::Duration;

/// Tollgate error types
#[derive(Debug, thiserror::Error)]
pub enum TollgateError {
    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),

    #[error("empty response from provider")]
    EmptyResponse,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Gateway outcomes that could not be recovered from cache
    /// The provider's spend cap for the current period is reached and no
    /// cached record (fresh, expired or fallback) exists for the request.
    #[error(
        "budget exceeded for provider '{provider}': no cached data available for {entity}/{data_type}"
    )]
    BudgetExhausted {
        provider: String,
        entity: String,
        data_type: String,
    },

    /// The upstream call failed and no cached record exists to fall back on.
    #[error("data fetch from '{provider}' failed: {source}")]
    UpstreamFailure {
        provider: String,
        #[source]
        source: Box<TollgateError>,
    },

    // Configuration errors
    #[error("no provider configured")]
    NoProvider,

    #[error("no provider serves data type '{0}'")]
    UnknownDataType(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl TollgateError {
    /// Whether a retry of the same upstream call may succeed.
    ///
    /// Network errors, rate limiting, timeouts and 5xx responses are
    /// transient. Everything else (auth, 4xx, budget, configuration) is
    /// permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            TollgateError::Http(_)
            | TollgateError::RateLimited { .. }
            | TollgateError::Timeout(_) => true,
            TollgateError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Provider-supplied hint for when to retry, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TollgateError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Short machine-readable name, used in batch failure entries and HTTP
    /// error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            TollgateError::Http(_) => "http",
            TollgateError::Api { .. } => "api",
            TollgateError::RateLimited { .. } => "rate_limited",
            TollgateError::AuthenticationFailed => "authentication_failed",
            TollgateError::Timeout(_) => "timeout",
            TollgateError::EmptyResponse => "empty_response",
            TollgateError::Json(_) => "json",
            TollgateError::InvalidInput(_) => "invalid_input",
            TollgateError::BudgetExhausted { .. } => "budget_exhausted",
            TollgateError::UpstreamFailure { .. } => "upstream_failure",
            TollgateError::NoProvider => "no_provider",
            TollgateError::UnknownDataType(_) => "unknown_data_type",
            TollgateError::UnknownProvider(_) => "unknown_provider",
            TollgateError::Configuration(_) => "configuration",
            TollgateError::Internal(_) => "internal",
        }
    }
}

/// Result type alias for Tollgate operations
pub type Result<T> = std::result::Result<T, TollgateError>;
