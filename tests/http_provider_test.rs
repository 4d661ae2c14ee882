//! Wiremock integration tests for HttpDataProvider.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tollgate::providers::{DataProvider, HttpDataProvider, ProviderRequest};
use tollgate::{
    BudgetConfig, DataGateway, DataRequest, DataTypePolicy, ProviderSpec, RetryConfig, Source,
    Tollgate, TollgateError,
};

fn provider(server: &MockServer) -> HttpDataProvider {
    HttpDataProvider::new("openbb", server.uri())
        .unwrap()
        .api_key("test_key")
}

/// Successful fetch sends the documented path, query and auth header.
#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(query_param("entity", "acme"))
        .and(query_param("website", "acme.com"))
        .and(header("Authorization", "Bearer test_key"))
        .and(header("user-agent", tollgate::version::user_agent().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"employees": 120})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = ProviderRequest::new("acme", "profile").website(Some("acme.com".into()));
    let response = provider(&mock_server).fetch(&request).await.unwrap();

    assert_eq!(response.data, json!({"employees": 120}));
    assert_eq!(response.cost, None);
    assert_eq!(response.confidence, None);
}

#[tokio::test]
async fn test_website_omitted_when_absent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param_is_missing("website"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = provider(&mock_server)
        .fetch(&ProviderRequest::new("acme", "news"))
        .await
        .unwrap();
    assert_eq!(response.data, json!([]));
}

#[tokio::test]
async fn test_cost_and_confidence_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-cost", "0.45")
                .insert_header("x-confidence", "0.8")
                .set_body_json(json!({"ok": true})),
        )
        .mount(&mock_server)
        .await;

    let response = provider(&mock_server)
        .fetch(&ProviderRequest::new("acme", "profile"))
        .await
        .unwrap();
    assert_eq!(response.cost, Some(Decimal::new(45, 2)));
    assert_eq!(response.confidence, Some(0.8));
}

#[tokio::test]
async fn test_rate_limit_with_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server)
        .fetch(&ProviderRequest::new("acme", "profile"))
        .await
        .unwrap_err();
    match err {
        TollgateError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(12)));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server)
        .fetch(&ProviderRequest::new("acme", "profile"))
        .await
        .unwrap_err();
    assert!(matches!(err, TollgateError::AuthenticationFailed));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server)
        .fetch(&ProviderRequest::new("acme", "profile"))
        .await
        .unwrap_err();
    assert!(matches!(err, TollgateError::Api { status: 500, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server)
        .fetch(&ProviderRequest::new("acme", "profile"))
        .await
        .unwrap_err();
    assert!(matches!(err, TollgateError::EmptyResponse));
}

#[tokio::test]
async fn test_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server)
        .fetch(&ProviderRequest::new("acme", "profile"))
        .await
        .unwrap_err();
    assert!(matches!(err, TollgateError::Json(_)));
}

/// Gateway over a real HTTP provider: a 503 is retried under one reservation.
#[tokio::test]
async fn test_gateway_retries_transient_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Acme"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = Tollgate::builder()
        .provider(
            ProviderSpec::new(
                Arc::new(provider(&mock_server)),
                BudgetConfig::daily(Decimal::ONE),
            )
            .data_type(
                "profile",
                DataTypePolicy::new(Decimal::new(30, 2), Duration::from_secs(60)),
            ),
        )
        .retry(
            RetryConfig::new()
                .max_attempts(2)
                .initial_delay(Duration::from_millis(10)),
        )
        .build()
        .unwrap();

    let envelope = gateway
        .fetch(&DataRequest::new("Acme", "profile"))
        .await
        .unwrap();
    assert_eq!(envelope.source, Source::Api);
    assert_eq!(envelope.data, json!({"name": "Acme"}));

    // Charged once, not once per attempt.
    let status = gateway.budget_status("openbb").await.unwrap();
    assert_eq!(status.spent_amount, Decimal::new(30, 2));
}
