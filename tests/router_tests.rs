use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use nawth::config::DatabaseConfig;
use nawth::db::{Backend, ConnectionManager, Connector, DocumentBackend};
use nawth::error::StoreError;
use nawth::server::{AppState, app_router};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), 64 * 1024)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

#[tokio::test]
async fn health_and_ready_report_connection_state() {
    let db = Arc::new(ConnectionManager::from_config(&DatabaseConfig::document(None)));
    let app = app_router(AppState::new(db.clone()));

    // 1) nothing connected yet -> 503 disconnected
    let resp = app.clone().oneshot(get("/health")).await.expect("request failed");
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(resp.headers().contains_key("x-request-id"));
    let body = json_body(resp).await;
    assert_eq!(body["status"], "disconnected");
    assert_eq!(body["backend"], "document");

    // 2) /ready connects -> 200 healthy
    let resp = app.clone().oneshot(get("/ready")).await.expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "healthy");

    // 3) /health now sees the live handle
    let resp = app.clone().oneshot(get("/health")).await.expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    // 4) after disconnect -> 503 again
    db.disconnect().await;
    let resp = app.oneshot(get("/health")).await.expect("request failed");
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn request_id_is_echoed_and_unknown_paths_404() {
    let db = Arc::new(ConnectionManager::from_config(&DatabaseConfig::document(None)));
    let app = app_router(AppState::new(db));

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(
        resp.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-123")
    );

    let resp = app.oneshot(get("/nope")).await.expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.headers().contains_key("x-request-id"));
}

struct ClosedStoreConnector;

#[async_trait]
impl Connector for ClosedStoreConnector {
    fn backend_name(&self) -> &'static str {
        "document"
    }

    async fn connect(&self) -> Result<Arc<dyn Backend>, StoreError> {
        let store = DocumentBackend::in_memory();
        store.close().await;
        Ok(Arc::new(store))
    }
}

#[tokio::test]
async fn ready_reports_unhealthy_backend() {
    let db = Arc::new(ConnectionManager::new(ClosedStoreConnector));
    let app = app_router(AppState::new(db));

    let resp = app.oneshot(get("/ready")).await.expect("request failed");
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["backend"], "document");
}
