//! Integration tests for the API client over real HTTP
//!
//! Drives `ApiClient` with the reqwest transport against wiremock servers:
//! signing on the wire, status classification, and host failover.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use http::Method;
use signway_core::signing::{canonical_request, request_digest};
use signway_core::testing::fixtures;
use signway_core::{ManualClock, TokenClaims};
use signway_domain::{ApiError, TransportErrorKind};
use signway_infra::{ApiClient, ApiClientBuilder, ReqwestTransport};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const NOW: i64 = 1_700_000_000;

fn fast_transport() -> Arc<ReqwestTransport> {
    Arc::new(
        ReqwestTransport::builder()
            .connect_timeout(Duration::from_millis(300))
            .read_timeout(Duration::from_millis(300))
            .timeout(Duration::from_millis(500))
            .build()
            .expect("transport"),
    )
}

fn client_for(hosts: &[String]) -> ApiClientBuilder {
    ApiClient::builder()
        .credential(fixtures::ed25519_credential())
        .hosts(hosts.iter().cloned())
        .clock(Arc::new(ManualClock::new(NOW)))
        .transport(fast_transport())
}

fn claims_of(request: &Request) -> TokenClaims {
    let header = request.headers.get("authorization").expect("authorization header");
    let token = header.to_str().unwrap().strip_prefix("Bearer ").expect("bearer prefix");
    let payload = token.split('.').nth(1).expect("payload segment");
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
}

fn dead_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
struct Order {
    symbol: String,
    qty: u32,
}

#[tokio::test]
async fn signed_request_reaches_server_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .and(header_exists("authorization"))
        .and(header_exists("x-request-id"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(Order { symbol: "BTC".into(), qty: 2 }),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&[server.uri()]).build().unwrap();
    let order = Order { symbol: "BTC".into(), qty: 2 };
    let echoed: Order = client.post_json("/v1/orders?dry_run=true", &order).await.unwrap();
    assert_eq!(echoed, order);

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    let claims = claims_of(request);
    assert_eq!(claims.uid, "client-user");
    assert_eq!(claims.sid, "client-session");
    assert_eq!(claims.iat, NOW);
    assert_eq!(claims.exp, NOW + 30);
    assert_eq!(
        claims.sig,
        request_digest(&canonical_request(&Method::POST, "/v1/orders?dry_run=true", &request.body))
    );
    assert_eq!(request.headers.get("user-agent").unwrap(), signway_domain::constants::DEFAULT_USER_AGENT);
}

#[tokio::test]
async fn rsa_credential_signs_with_rs256() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(204)).mount(&server).await;

    let client =
        client_for(&[server.uri()]).credential(fixtures::rsa_credential()).build().unwrap();
    client.get_json::<()>("/v1/ping").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let token = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
    let header_segment = token.trim_start_matches("Bearer ").split('.').next().unwrap();
    let header: serde_json::Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_segment).unwrap()).unwrap();
    assert_eq!(header["alg"], "RS256");
}

#[tokio::test]
async fn status_codes_map_to_typed_errors() {
    let server = MockServer::start().await;
    Mock::given(path("/missing")).respond_with(ResponseTemplate::new(404)).mount(&server).await;
    Mock::given(path("/down"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_json(serde_json::json!({"code": 5003, "message": "maintenance"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&[server.uri()]).enable_auto_switch().build().unwrap();

    let err = client.get_json::<Order>("/missing").await.unwrap_err();
    assert_eq!(err, ApiError::client(404));
    assert!(!err.is_retryable());

    let err = client.get_json::<Order>("/down").await.unwrap_err();
    let ApiError::ServerError { code, body: Some(body) } = &err else {
        panic!("expected server error with body, got {err:?}");
    };
    assert_eq!(*code, 503);
    assert_eq!(body.code.as_deref(), Some("5003"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn timeout_switches_host_and_caller_resubmits() {
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&slow)
        .await;
    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(Order { symbol: "ETH".into(), qty: 1 }),
        )
        .expect(1)
        .mount(&healthy)
        .await;

    let client =
        client_for(&[slow.uri(), healthy.uri()]).enable_auto_switch().build().unwrap();

    let err = client.get_json::<Order>("/v1/orders/1").await.unwrap_err();
    assert!(
        matches!(&err, ApiError::Transport(e) if e.kind == TransportErrorKind::Timeout),
        "unexpected error: {err:?}"
    );
    assert_eq!(client.current_base_url().as_str(), format!("{}/", healthy.uri()));
    assert!(healthy.received_requests().await.unwrap().is_empty());

    let order: Order = client.get_json("/v1/orders/1").await.unwrap();
    assert_eq!(order.symbol, "ETH");
}

#[tokio::test]
async fn timeout_without_auto_switch_keeps_host() {
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&slow)
        .await;
    let healthy = MockServer::start().await;

    let client = client_for(&[slow.uri(), healthy.uri()]).build().unwrap();
    let err = client.get_json::<Order>("/v1/orders/1").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(client.current_base_url().as_str(), format!("{}/", slow.uri()));
}

#[tokio::test]
async fn refused_connection_does_not_switch() {
    let healthy = MockServer::start().await;
    let dead = dead_port_url();

    let client = client_for(&[dead.clone(), healthy.uri()]).enable_auto_switch().build().unwrap();
    let err = client.get_json::<Order>("/v1/orders/1").await.unwrap_err();

    assert!(
        matches!(&err, ApiError::Transport(e) if e.kind == TransportErrorKind::ConnectionRefused),
        "unexpected error: {err:?}"
    );
    assert_eq!(client.current_base_url().as_str(), format!("{dead}/"));
}

#[tokio::test]
async fn user_credential_is_used_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    let client = client_for(&[server.uri()]).debug_logging(true).build().unwrap();
    client.set_user_credential(fixtures::user_credential()).unwrap();
    client.authenticate_and_send(Method::GET, "/v1/me", Vec::new()).await.unwrap();
    client.clear_user_credential();
    client.authenticate_and_send(Method::GET, "/v1/me", Vec::new()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(claims_of(&requests[0]).uid, "end-user");
    assert_eq!(claims_of(&requests[1]).uid, "client-user");
}
