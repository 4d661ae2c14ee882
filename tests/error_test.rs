use std::time::Duration;

use tollgate::{Result, TollgateError};

#[test]
fn test_error_display() {
    let err = TollgateError::UnknownDataType("funding".to_string());
    assert!(err.to_string().contains("funding"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(TollgateError::NoProvider)
    }
    assert!(returns_error().is_err());
}

#[test]
fn budget_exhausted_names_provider_and_key() {
    let err = TollgateError::BudgetExhausted {
        provider: "openbb".into(),
        entity: "acme".into(),
        data_type: "profile".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("openbb"));
    assert!(msg.contains("acme/profile"));
    assert_eq!(err.kind(), "budget_exhausted");
}

#[test]
fn upstream_failure_keeps_its_source() {
    let err = TollgateError::UpstreamFailure {
        provider: "openbb".into(),
        source: Box::new(TollgateError::Timeout(Duration::from_secs(30))),
    };
    let source = std::error::Error::source(&err).expect("source");
    assert!(source.to_string().contains("timed out"));
    assert!(!err.is_transient());
}

// ============================================================================
// Transient error classification
// ============================================================================

#[test]
fn transient_errors() {
    assert!(TollgateError::RateLimited { retry_after: None }.is_transient());
    assert!(TollgateError::Http("connection reset".into()).is_transient());
    assert!(TollgateError::Timeout(Duration::from_secs(1)).is_transient());
    assert!(
        TollgateError::Api {
            status: 502,
            message: "bad gateway".into()
        }
        .is_transient()
    );
}

#[test]
fn permanent_errors() {
    assert!(!TollgateError::AuthenticationFailed.is_transient());
    assert!(!TollgateError::EmptyResponse.is_transient());
    assert!(!TollgateError::InvalidInput("x".into()).is_transient());
    assert!(
        !TollgateError::Api {
            status: 400,
            message: "bad request".into()
        }
        .is_transient()
    );
    assert!(!TollgateError::Configuration("x".into()).is_transient());
}

#[test]
fn retry_after_only_from_rate_limits() {
    let hint = Some(Duration::from_secs(7));
    assert_eq!(
        TollgateError::RateLimited { retry_after: hint }.retry_after(),
        hint
    );
    assert_eq!(TollgateError::Http("x".into()).retry_after(), None);
}

#[test]
fn json_errors_convert() {
    let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
    let err: TollgateError = parse.unwrap_err().into();
    assert_eq!(err.kind(), "json");
}
