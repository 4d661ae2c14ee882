use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::TollgateError;

/// JSON error body: `{"error": kind, "detail": message}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

pub struct ApiError(pub TollgateError);

impl From<TollgateError> for ApiError {
    fn from(err: TollgateError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TollgateError::BudgetExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            TollgateError::UpstreamFailure { .. } => StatusCode::BAD_GATEWAY,
            TollgateError::InvalidInput(_)
            | TollgateError::UnknownDataType(_)
            | TollgateError::Json(_) => StatusCode::BAD_REQUEST,
            TollgateError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
            "internal error".to_string()
        } else {
            self.0.to_string()
        };
        let body = ErrorBody {
            error: self.0.kind().to_string(),
            detail,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (
                TollgateError::BudgetExhausted {
                    provider: "p".into(),
                    entity: "e".into(),
                    data_type: "t".into(),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                TollgateError::UpstreamFailure {
                    provider: "p".into(),
                    source: Box::new(TollgateError::EmptyResponse),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (TollgateError::UnknownDataType("x".into()), StatusCode::BAD_REQUEST),
            (TollgateError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (TollgateError::UnknownProvider("x".into()), StatusCode::NOT_FOUND),
            (TollgateError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
