// HTTP surface tests: interception headers and control routes
// Author: storecache contributors

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{cache_config, manager, store_names, FakeNetwork};
use serde_json::Value;
use std::sync::Arc;
use storecache::cache::{CacheStorage, MemoryCacheStorage};
use storecache::config::AppConfig;
use storecache::models::CacheKey;
use storecache::server::{create_router, SOURCE_HEADER};
use storecache::worker::CacheManager;
use tower::ServiceExt;

struct Harness {
    app: Router,
    manager: Arc<CacheManager>,
    storage: Arc<MemoryCacheStorage>,
    network: Arc<FakeNetwork>,
}

async fn harness(activate: bool) -> Harness {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = FakeNetwork::new();
    network.serve("/", 200, "<html>home</html>");
    network.serve("/offline.html", 200, "<html>offline</html>");
    network.serve("/main.js", 200, "main()");
    network.serve("/contact", 200, "thanks");

    let manifest = ["/", "/offline.html"];
    let manager = Arc::new(manager(cache_config("v3", &manifest), storage.clone(), network.clone()));
    if activate {
        manager
            .register("v3", manifest.iter().map(|p| p.to_string()).collect())
            .await
            .unwrap();
    }

    let mut config = AppConfig::default();
    config.cache = cache_config("v3", &manifest);
    let app = create_router(config, manager.clone()).unwrap();

    Harness {
        app,
        manager,
        storage,
        network,
    }
}

fn navigation(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("sec-fetch-mode", "navigate")
        .header("sec-fetch-dest", "document")
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_navigation_is_served_from_network() {
    let h = harness(true).await;
    let response = h.app.oneshot(navigation("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[SOURCE_HEADER], "network");
}

#[tokio::test]
async fn test_offline_navigation_serves_offline_page() {
    let h = harness(true).await;
    h.network.set_offline(true);

    let response = h.app.oneshot(navigation("/products/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[SOURCE_HEADER], "offline-fallback");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"<html>offline</html>");
}

#[tokio::test]
async fn test_unavailable_image_is_bad_gateway() {
    let h = harness(true).await;
    h.network.set_offline(true);

    let request = Request::builder()
        .uri("/icons/icon-512.png")
        .header("sec-fetch-dest", "image")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "network_error");
}

#[tokio::test]
async fn test_conditional_navigation_is_fetched_in_full_and_cached() {
    let h = harness(true).await;
    h.network.serve("/about", 200, "<html>about</html>");

    let request = Request::builder()
        .uri("/about")
        .header("sec-fetch-mode", "navigate")
        .header("sec-fetch-dest", "document")
        .header("if-none-match", "\"about-v1\"")
        .header("if-modified-since", "Tue, 01 Sep 2026 10:00:00 GMT")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = h.network.sent_headers();
    let last = sent.last().unwrap();
    assert!(!last.iter().any(|(k, _)| k.starts_with("if-")));

    let cached = h
        .storage
        .get("bdm-runtime-v3", &CacheKey::get("/about"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.status, 200);
}

#[tokio::test]
async fn test_conditional_image_is_cached() {
    let h = harness(true).await;
    h.network.serve("/icons/icon-96.png", 200, "png");

    let request = Request::builder()
        .uri("/icons/icon-96.png")
        .header("sec-fetch-dest", "image")
        .header("if-none-match", "\"icon\"")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    h.network.set_offline(true);
    let request = Request::builder()
        .uri("/icons/icon-96.png")
        .header("sec-fetch-dest", "image")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[SOURCE_HEADER], "cache");
}

#[tokio::test]
async fn test_conditional_uncached_request_keeps_validators() {
    let h = harness(true).await;
    h.network.serve("/manifest.json", 200, "{}");

    let request = Request::builder()
        .uri("/manifest.json")
        .header("if-none-match", "\"m1\"")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_post_passes_through_without_caching() {
    let h = harness(true).await;
    let before = store_names(&h.storage).await;

    let request = Request::builder()
        .method("POST")
        .uri("/contact")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("email=a%40b.c"))
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SOURCE_HEADER).is_none());
    assert!(h
        .network
        .calls()
        .contains(&("POST".to_string(), "/contact".to_string())));
    assert_eq!(store_names(&h.storage).await, before);
}

#[tokio::test]
async fn test_requests_pass_through_before_activation() {
    let h = harness(false).await;
    let response = h.app.oneshot(navigation("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SOURCE_HEADER).is_none());
    assert!(store_names(&h.storage).await.is_empty());
}

#[tokio::test]
async fn test_status_endpoint() {
    let h = harness(true).await;
    let request = Request::builder()
        .uri("/__storecache/status")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["active"]["version"], "v3");
    assert_eq!(body["active"]["state"], "activated");
    assert!(body["waiting"].is_null());
    assert!(body["stores"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s["name"] == "bdm-precache-v3" && s["entries"] == 2));
}

#[tokio::test]
async fn test_skip_waiting_message_activates_waiting_generation() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = FakeNetwork::new();
    let mut cache = cache_config("v2", &[]);
    cache.skip_waiting_on_install = false;
    let manager = Arc::new(manager(cache.clone(), storage, network));
    manager.register("v2", Vec::new()).await.unwrap();
    manager.register("v3", Vec::new()).await.unwrap();
    assert_eq!(manager.waiting().unwrap().version(), "v3");

    let mut config = AppConfig::default();
    config.cache = cache;
    let app = create_router(config, manager.clone()).unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/__storecache/message")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"type":"SKIP_WAITING"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["outcome"], "activated");
    assert_eq!(body["version"], "v3");
    assert_eq!(manager.active().unwrap().version(), "v3");
}

#[tokio::test]
async fn test_message_must_be_json() {
    let h = harness(true).await;
    let request = Request::builder()
        .method("POST")
        .uri("/__storecache/message")
        .body(Body::from("SKIP_WAITING"))
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.manager.active().unwrap().version(), "v3");
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = harness(true).await;
    let request = Request::builder()
        .uri("/__storecache/health")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["generation"]["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let h = harness(true).await;
    let request = Request::builder()
        .uri("/__storecache/metrics")
        .body(Body::empty())
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&body).contains("lifecycle_transitions_total"));
}
