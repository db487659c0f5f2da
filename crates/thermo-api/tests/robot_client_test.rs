#![allow(clippy::unwrap_used)]
// Integration tests for `RobotClient` / `ServoClient` using wiremock.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use thermo_api::{ApiKeyCredential, Error, RobotClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

fn credential() -> ApiKeyCredential {
    ApiKeyCredential::new("key-id", SecretString::from("s3cret".to_string()))
}

fn transport() -> TransportConfig {
    TransportConfig {
        timeout: Duration::from_secs(5),
        ..TransportConfig::default()
    }
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/auth"))
        .and(body_json(json!({
            "entity": "key-id",
            "credential": { "type": "api-key", "payload": "s3cret" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok-123" })),
        )
        .mount(server)
        .await;
}

async fn connected(server: &MockServer) -> RobotClient {
    mount_auth(server).await;
    let base = Url::parse(&server.uri()).unwrap();
    RobotClient::connect(base, &credential(), &transport())
        .await
        .unwrap()
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_success() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    assert_eq!(client.base_url().as_str().trim_end_matches('/'), server.uri());
}

#[tokio::test]
async fn test_connect_invalid_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let result = RobotClient::connect(base, &credential(), &transport()).await;

    assert!(
        matches!(result, Err(Error::InvalidApiKey)),
        "expected InvalidApiKey, got: {result:?}"
    );
}

#[tokio::test]
async fn test_connect_forbidden_entity() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth"))
        .respond_with(ResponseTemplate::new(403).set_body_string("entity disabled"))
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let result = RobotClient::connect(base, &credential(), &transport()).await;

    match result {
        Err(Error::Authentication { message }) => assert_eq!(message, "entity disabled"),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_connect_malformed_token_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let result = RobotClient::connect(base, &credential(), &transport()).await;

    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

// ── Servo ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_position_sends_bearer_token() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/components/servo/thermo-dial/position"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "position_deg": 95 })))
        .expect(1)
        .mount(&server)
        .await;

    let servo = client.servo("thermo-dial");
    assert_eq!(servo.name(), "thermo-dial");
    assert_eq!(servo.get_position().await.unwrap(), 95);
}

#[tokio::test]
async fn test_move_posts_angle() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/components/servo/thermo-dial/move"))
        .and(body_json(json!({ "angle_deg": 120 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client.servo("thermo-dial").move_to(120).await.unwrap();
}

#[tokio::test]
async fn test_unknown_component() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/components/servo/nope/position"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = client.servo("nope").get_position().await;
    assert!(
        matches!(result, Err(Error::ComponentNotFound { ref name }) if name == "nope"),
        "expected ComponentNotFound, got: {result:?}"
    );
}

#[tokio::test]
async fn test_move_server_error() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/components/servo/thermo-dial/move"))
        .respond_with(ResponseTemplate::new(503).set_body_string("servo busy"))
        .mount(&server)
        .await;

    let result = client.servo("thermo-dial").move_to(50).await;
    match result {
        Err(err @ Error::Api { status: 503, .. }) => assert!(err.is_transient()),
        other => panic!("expected Api 503, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_expired_token_on_component_call() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/components/servo/thermo-dial/position"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.servo("thermo-dial").get_position().await;
    assert!(
        matches!(result, Err(ref e) if e.is_auth_error()),
        "expected auth error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_slow_gateway_times_out() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    let base = Url::parse(&server.uri()).unwrap();
    let transport = TransportConfig {
        timeout: Duration::from_secs(1),
        ..TransportConfig::default()
    };
    let client = RobotClient::connect(base, &credential(), &transport)
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/components/servo/thermo-dial/position"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "position_deg": 95 }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let result = client.servo("thermo-dial").get_position().await;
    assert!(
        matches!(result, Err(Error::Timeout { timeout }) if timeout == Duration::from_secs(1)),
        "expected Timeout, got: {result:?}"
    );
}
