//! Config and secrets loading from disk.
#![cfg(all(feature = "server", unix))]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use rust_decimal::Decimal;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tollgate::server::config::{Config, Secrets};
use tollgate::{DataGateway, DataRequest, Source, TollgateError};

fn write(dir: &TempDir, name: &str, content: &str, mode: u32) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    path
}

const SECRETS: &str = r#"
[openbb]
api_key = "ob-secret"
"#;

#[test]
fn secrets_readable_by_others_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "secrets.toml", SECRETS, 0o644);

    let err = Secrets::load_from_file(&path).unwrap_err();
    match err {
        TollgateError::Configuration(msg) => assert!(msg.contains("insecure permissions")),
        other => panic!("expected Configuration error, got {other:?}"),
    }
}

#[test]
fn owner_only_secrets_are_accepted() {
    let dir = TempDir::new().unwrap();
    for mode in [0o600, 0o400] {
        let path = write(&dir, &format!("secrets-{mode:o}.toml"), SECRETS, mode);
        let secrets = Secrets::load_from_file(&path).unwrap();
        assert_eq!(secrets.api_key("openbb").as_deref(), Some("ob-secret"));
    }
}

#[test]
fn missing_explicit_config_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/tollgate.toml"))).unwrap_err();
    assert!(matches!(err, TollgateError::Configuration(_)));
}

#[test]
fn invalid_config_file_names_the_path() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.toml", "[server\naddress = 1", 0o644);
    match Config::load(Some(&path)).unwrap_err() {
        TollgateError::Configuration(msg) => assert!(msg.contains("config.toml")),
        other => panic!("expected Configuration error, got {other:?}"),
    }
}

/// A config file on disk drives a working gateway, keyed from the secrets file.
#[tokio::test]
async fn config_file_builds_working_gateway() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(query_param("entity", "acme"))
        .and(header("Authorization", "Bearer ob-secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-cost", "0.25")
                .set_body_json(json!({"name": "Acme"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config_path = write(
        &dir,
        "config.toml",
        &format!(
            r#"
[server]
address = "127.0.0.1:0"

[retry]
max_attempts = 1

[providers.openbb]
base_url = "{}"
budget_cap = "5.00"
period = "monthly"

[providers.openbb.data_types.profile]
cost = "0.30"
ttl_secs = 3600
"#,
            mock_server.uri()
        ),
        0o644,
    );
    let secrets_path = write(&dir, "secrets.toml", SECRETS, 0o600);

    let config = Config::load(Some(&config_path)).unwrap();
    let secrets = Secrets::load_from_file(&secrets_path).unwrap();
    let gateway = config.build_gateway(&secrets).unwrap();

    let first = gateway
        .fetch(&DataRequest::new("Acme", "profile"))
        .await
        .unwrap();
    assert_eq!(first.source, Source::Api);
    assert_eq!(first.cost, Some(Decimal::new(25, 2)));

    let second = gateway
        .fetch(&DataRequest::new("acme", "profile"))
        .await
        .unwrap();
    assert_eq!(second.source, Source::Cache);

    let status = gateway.budget_status("openbb").await.unwrap();
    assert_eq!(status.cap_amount, Decimal::new(500, 2));
    assert_eq!(status.spent_amount, Decimal::new(25, 2));
}

#[test]
fn config_without_providers_cannot_build() {
    let config = Config::parse("").unwrap();
    let err = config.build_gateway(&Secrets::default()).err().expect("expected an error");
    assert!(matches!(err, TollgateError::NoProvider));
}
