//! Admin API behaviour, exercised in-process.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{Harness, Step, API_KEY};
use hostpanel::AdminServer;

fn router(h: &Harness) -> Router {
    AdminServer::new(h.service.clone(), &h.config).router()
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {API_KEY}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_healthz_needs_no_auth() {
    let h = Harness::new();
    let req = Request::get("/healthz").body(Body::empty()).unwrap();

    let (status, body) = send(&router(&h), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_api_rejects_missing_or_wrong_key() {
    let h = Harness::new();
    let app = router(&h);

    let req = Request::get("/api/domains").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let req = Request::get("/api/domains")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_id_is_assigned() {
    let h = Harness::new();
    let req = Request::get("/healthz").body(Body::empty()).unwrap();

    let response = router(&h).oneshot(req).await.unwrap();
    let id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn test_domain_lifecycle_over_http() {
    let h = Harness::new();
    let app = router(&h);

    let (status, created) = send(
        &app,
        request(Method::POST, "/api/domains", Some(json!({ "name": "Example.com" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "example.com");
    assert_eq!(created["tls_state"], "NONE");

    let (status, list) = send(&app, request(Method::GET, "/api/domains", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, tls) = send(&app, request(Method::POST, "/api/domains/example.com/tls", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tls["tls_state"], "ACTIVE");

    let (status, status_body) = send(&app, request(Method::GET, "/api/status", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_body["domains"], 1);
    assert_eq!(status_body["tls_active"], 1);

    let (status, _) = send(
        &app,
        request(Method::DELETE, "/api/domains/example.com?purge=false", None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(h.site_dir("example.com").exists());

    let (status, body) = send(&app, request(Method::GET, "/api/domains/example.com", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["stage"], "lookup");
}

#[tokio::test]
async fn test_error_status_mapping() {
    let h = Harness::new();
    let app = router(&h);

    let (status, body) = send(
        &app,
        request(Method::POST, "/api/domains", Some(json!({ "name": "../etc" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_domain");
    assert_eq!(body["stage"], "validate");

    send(&app, request(Method::POST, "/api/domains", Some(json!({ "name": "a.com" })))).await;
    let (status, body) = send(
        &app,
        request(Method::POST, "/api/domains", Some(json!({ "name": "a.com" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_domain");
}

#[tokio::test]
async fn test_proxy_failure_reports_leftover_root() {
    let h = Harness::new();
    h.proxy.script_reload(Step::Fail("boom"));

    let (status, body) = send(
        &router(&h),
        request(Method::POST, "/api/domains", Some(json!({ "name": "b.com" }))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "proxy_failure");
    assert_eq!(body["stage"], "activate");
    assert_eq!(
        body["leftover_root"],
        h.document_root("b.com").to_str().unwrap()
    );
}
