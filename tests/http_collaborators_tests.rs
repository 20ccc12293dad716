//! HTTP transport and profile service against a mock server.

mod support;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use keygate::error::KeygateError;
use keygate::profile::{HttpProfileService, ProfileService};
use keygate::request::{HttpTransport, RequestExecutor, Transport, TransportRequest};
use keygate::session::{SessionContext, SessionStore};
use support::{FakeIdentityProvider, RecordingNotifier};

fn get(target: &str) -> TransportRequest {
    TransportRequest {
        target: target.to_string(),
        method: Method::GET,
        headers: HeaderMap::new(),
        body: None,
    }
}

#[tokio::test]
async fn transport_resolves_target_and_parses_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workouts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let response = transport.send(get("/api/v1/workouts")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!([{"id": 1}]));
}

#[tokio::test]
async fn transport_sends_method_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/profile"))
        .and(header("x-trace", "abc"))
        .and(body_json(json!({"goals": ["strength"]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert("x-trace", HeaderValue::from_static("abc"));
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    let request = TransportRequest {
        target: "/api/v1/profile".to_string(),
        method: Method::PUT,
        headers,
        body: Some(json!({"goals": ["strength"]})),
    };

    let response = HttpTransport::new(server.uri()).send(request).await.unwrap();

    assert_eq!(response.status, 204);
    assert_eq!(response.body, Value::Null);
}

#[tokio::test]
async fn transport_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({
                "detail": {"error": "USER_EXISTS", "message": "User already exists"}
            })),
        )
        .mount(&server)
        .await;

    let err = HttpTransport::new(server.uri())
        .send(get("/api/v1/users"))
        .await
        .unwrap_err();

    assert_eq!(err.status, Some(409));
    assert_eq!(err.detail().as_deref(), Some("User already exists"));
}

#[tokio::test]
async fn unreachable_server_has_no_status() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = HttpTransport::new(uri).send(get("/x")).await.unwrap_err();

    assert_eq!(err.status, None);
    assert!(err.detail().is_none());
}

#[tokio::test]
async fn profile_service_sends_bearer_and_decodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/profile"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_completed_onboarding": true,
            "email": "a@b.com",
            "goals": ["strength"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = HttpProfileService::new(format!("{}/api/v1/profile", server.uri()));
    let profile = service.fetch_profile("token-1").await.unwrap();

    assert!(profile.has_completed_onboarding);
    assert_eq!(profile.email.as_deref(), Some("a@b.com"));
    assert_eq!(profile.goals, Some(vec!["strength".to_string()]));
}

#[tokio::test]
async fn profile_service_non_success_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Profile not found"})))
        .mount(&server)
        .await;

    let service = HttpProfileService::new(format!("{}/api/v1/profile", server.uri()));
    let err = service.fetch_profile("token-1").await.unwrap_err();

    assert!(matches!(err, KeygateError::ProfileUnavailable(_)));
}

#[tokio::test]
async fn executor_over_http_reports_unauthorized_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/profile"))
        .respond_with(move |request: &Request| {
            if request.headers.contains_key("authorization") {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(401).set_body_json(json!({"detail": "unauthorized"}))
            }
        })
        .expect(1)
        .mount(&server)
        .await;

    let store = SessionStore::new(
        Arc::new(FakeIdentityProvider::new()),
        Arc::new(HttpProfileService::new(format!("{}/api/v1/profile", server.uri()))),
    );
    let notifier = Arc::new(RecordingNotifier::new());
    let executor = RequestExecutor::new(
        SessionContext::with_store(Arc::new(store)),
        Arc::new(HttpTransport::new(server.uri())),
        notifier.clone(),
    );
    let mut request = executor.request::<Value>();

    let err = request.execute("/api/v1/profile", None).await.unwrap_err();

    assert!(matches!(err, KeygateError::Transport(ref e) if e.status == Some(401)));
    assert_eq!(request.failure_message().as_deref(), Some("unauthorized"));
    assert_eq!(notifier.shown().len(), 1);
}

#[tokio::test]
async fn executor_over_http_attaches_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/profile"))
        .and(header_exists("authorization"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let store = SessionStore::new(
        Arc::new(FakeIdentityProvider::signed_in("token-1")),
        Arc::new(HttpProfileService::new(format!("{}/api/v1/profile", server.uri()))),
    );
    let executor = RequestExecutor::new(
        SessionContext::with_store(Arc::new(store)),
        Arc::new(HttpTransport::new(server.uri())),
        Arc::new(RecordingNotifier::new()),
    );

    let body: Value = executor.execute("/api/v1/profile", None).await.unwrap();
    assert_eq!(body, json!({"ok": true}));
}
