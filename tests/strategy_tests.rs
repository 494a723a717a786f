// Caching strategy tests against an in-memory store and a scripted origin
// Author: storecache contributors

mod common;

use common::{context, opened_storage, FakeNetwork};
use storecache::cache::CacheStorage;
use storecache::models::{CacheKey, FetchRequest, FetchResponse};
use storecache::worker::strategies::{cache_first, cache_or_network, network_first, stale_while_revalidate};
use storecache::worker::{OfflineFallback, ResponseSource};

const ASSETS: &str = "bdm-runtime-v3-assets";
const IMAGES: &str = "bdm-runtime-v3-images";
const RUNTIME: &str = "bdm-runtime-v3";
const PRECACHE: &str = "bdm-precache-v3";

fn fallback() -> OfflineFallback {
    OfflineFallback {
        offline_url: "/offline.html".into(),
        root_fallback: "/index.html".into(),
    }
}

fn body(response: &FetchResponse) -> &str {
    std::str::from_utf8(&response.body).unwrap()
}

#[tokio::test]
async fn test_stale_while_revalidate_serves_old_then_new() {
    let storage = opened_storage("v3").await;
    let network = FakeNetwork::new();
    let ctx = context(storage.clone(), network.clone());
    let request = FetchRequest::get("/main.js");

    storage
        .put(ASSETS, &request.cache_key(), &FetchResponse::new(200, "old()"))
        .await
        .unwrap();
    network.serve("/main.js", 200, "new()");

    let first = stale_while_revalidate(&ctx, ASSETS, &request).await.unwrap();
    assert_eq!(first.source, ResponseSource::Cache);
    assert_eq!(body(&first.response), "old()");
    first.revalidation.unwrap().await.unwrap();

    let second = stale_while_revalidate(&ctx, ASSETS, &request).await.unwrap();
    assert_eq!(body(&second.response), "new()");
    second.revalidation.unwrap().await.unwrap();
}

#[tokio::test]
async fn test_stale_while_revalidate_miss_waits_for_network() {
    let storage = opened_storage("v3").await;
    let network = FakeNetwork::new();
    network.serve("/style.css", 200, "body{}");
    let ctx = context(storage.clone(), network.clone());
    let request = FetchRequest::get("/style.css");

    let served = stale_while_revalidate(&ctx, ASSETS, &request).await.unwrap();
    assert_eq!(served.source, ResponseSource::Network);
    assert!(served.revalidation.is_none());
    assert!(storage.get(ASSETS, &request.cache_key()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_stale_while_revalidate_failure_propagates_without_cache() {
    let network = FakeNetwork::new();
    network.set_offline(true);
    let ctx = context(opened_storage("v3").await, network);

    assert!(stale_while_revalidate(&ctx, ASSETS, &FetchRequest::get("/main.js"))
        .await
        .is_err());
}

#[tokio::test]
async fn test_stale_while_revalidate_keeps_cache_when_refresh_fails() {
    let storage = opened_storage("v3").await;
    let network = FakeNetwork::new();
    let ctx = context(storage.clone(), network.clone());
    let request = FetchRequest::get("/main.js");
    storage
        .put(ASSETS, &request.cache_key(), &FetchResponse::new(200, "old()"))
        .await
        .unwrap();

    // A 500 refresh must not overwrite the cached copy.
    network.serve("/main.js", 500, "boom");
    let served = stale_while_revalidate(&ctx, ASSETS, &request).await.unwrap();
    served.revalidation.unwrap().await.unwrap();

    let cached = storage.get(ASSETS, &request.cache_key()).await.unwrap().unwrap();
    assert_eq!(body(&cached), "old()");
}

#[tokio::test]
async fn test_cache_first_hit_skips_network() {
    let storage = opened_storage("v3").await;
    let network = FakeNetwork::new();
    let ctx = context(storage.clone(), network.clone());
    let request = FetchRequest::get("/icons/icon-96.png");
    storage
        .put(IMAGES, &request.cache_key(), &FetchResponse::new(200, "png"))
        .await
        .unwrap();

    let served = cache_first(&ctx, IMAGES, &request).await;
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(network.calls_to("/icons/icon-96.png"), 0);
}

#[tokio::test]
async fn test_cache_first_miss_fetches_and_stores() {
    let storage = opened_storage("v3").await;
    let network = FakeNetwork::new();
    network.serve("/icons/icon-96.png", 200, "png");
    let ctx = context(storage.clone(), network.clone());
    let request = FetchRequest::get("/icons/icon-96.png");

    let served = cache_first(&ctx, IMAGES, &request).await;
    assert_eq!(served.source, ResponseSource::Network);
    let again = cache_first(&ctx, IMAGES, &request).await;
    assert_eq!(again.source, ResponseSource::Cache);
    assert_eq!(network.calls_to("/icons/icon-96.png"), 1);
}

#[tokio::test]
async fn test_cache_first_offline_returns_error_indicator() {
    let network = FakeNetwork::new();
    network.set_offline(true);
    let ctx = context(opened_storage("v3").await, network);

    let served = cache_first(&ctx, IMAGES, &FetchRequest::get("/icons/icon-96.png")).await;
    assert!(served.response.is_network_error());
    assert_eq!(served.source, ResponseSource::Unavailable);
}

#[tokio::test]
async fn test_cache_first_serves_precached_copy() {
    let storage = opened_storage("v3").await;
    let network = FakeNetwork::new();
    network.set_offline(true);
    let ctx = context(storage.clone(), network);
    let request = FetchRequest::get("/icons/icon-72.png");
    storage
        .put(PRECACHE, &request.cache_key(), &FetchResponse::new(200, "png"))
        .await
        .unwrap();

    let served = cache_first(&ctx, IMAGES, &request).await;
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(served.response.status, 200);
}

#[tokio::test]
async fn test_non_ok_responses_are_not_cached() {
    let storage = opened_storage("v3").await;
    let network = FakeNetwork::new();
    network.serve("/broken.png", 500, "boom");
    network.serve("/moved", 301, "");
    let ctx = context(storage.clone(), network);

    let served = cache_first(&ctx, IMAGES, &FetchRequest::get("/broken.png")).await;
    assert_eq!(served.response.status, 500);
    let served = network_first(&ctx, RUNTIME, &fallback(), &FetchRequest::navigate("/moved")).await;
    assert_eq!(served.response.status, 301);

    assert_eq!(storage.len(IMAGES).await.unwrap(), Some(0));
    assert!(storage.get(RUNTIME, &CacheKey::get("/moved")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_write_to_purged_store_is_dropped() {
    let storage = opened_storage("v2").await;
    let network = FakeNetwork::new();
    network.serve("/about", 200, "<html>about</html>");
    let ctx = context(storage.clone(), network);
    storage.delete("bdm-runtime-v2").await.unwrap();

    let served = network_first(&ctx, "bdm-runtime-v2", &fallback(), &FetchRequest::navigate("/about")).await;
    assert_eq!(served.response.status, 200);
    assert!(!storage.keys().await.unwrap().contains(&"bdm-runtime-v2".to_string()));
}

#[tokio::test]
async fn test_network_first_caches_live_response() {
    let storage = opened_storage("v3").await;
    let network = FakeNetwork::new();
    network.serve("/about", 200, "<html>about v1</html>");
    let ctx = context(storage.clone(), network.clone());
    let request = FetchRequest::navigate("/about");

    let served = network_first(&ctx, RUNTIME, &fallback(), &request).await;
    assert_eq!(served.source, ResponseSource::Network);
    assert_eq!(body(&served.response), "<html>about v1</html>");
    assert!(storage.get(RUNTIME, &request.cache_key()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_network_first_offline_serves_offline_document() {
    let storage = opened_storage("v3").await;
    let network = FakeNetwork::new();
    network.set_offline(true);
    let ctx = context(storage.clone(), network);
    storage
        .put(PRECACHE, &CacheKey::get("/offline.html"), &FetchResponse::new(200, "offline"))
        .await
        .unwrap();
    storage
        .put(PRECACHE, &CacheKey::get("/index.html"), &FetchResponse::new(200, "home"))
        .await
        .unwrap();

    let served = network_first(&ctx, RUNTIME, &fallback(), &FetchRequest::navigate("/products/42")).await;
    assert_eq!(served.source, ResponseSource::OfflineFallback);
    assert_eq!(body(&served.response), "offline");
}

#[tokio::test]
async fn test_network_first_offline_falls_back_to_root() {
    let storage = opened_storage("v3").await;
    let network = FakeNetwork::new();
    network.set_offline(true);
    let ctx = context(storage.clone(), network);
    storage
        .put(PRECACHE, &CacheKey::get("/index.html"), &FetchResponse::new(200, "home"))
        .await
        .unwrap();

    let served = network_first(&ctx, RUNTIME, &fallback(), &FetchRequest::navigate("/cart")).await;
    assert_eq!(body(&served.response), "home");
}

#[tokio::test]
async fn test_network_first_offline_without_fallbacks_is_503() {
    let network = FakeNetwork::new();
    network.set_offline(true);
    let ctx = context(opened_storage("v3").await, network);

    let served = network_first(&ctx, RUNTIME, &fallback(), &FetchRequest::navigate("/cart")).await;
    assert_eq!(served.response.status, 503);
    assert_eq!(body(&served.response), "You are offline");
    assert_eq!(served.source, ResponseSource::OfflineFallback);
}

#[tokio::test]
async fn test_cache_or_network_never_writes() {
    let storage = opened_storage("v3").await;
    let network = FakeNetwork::new();
    network.serve("/manifest.json", 200, "{}");
    let ctx = context(storage.clone(), network.clone());
    let request = FetchRequest::get("/manifest.json");

    let served = cache_or_network(&ctx, &request).await.unwrap();
    assert_eq!(served.source, ResponseSource::Network);
    for store in [PRECACHE, RUNTIME, ASSETS, IMAGES] {
        assert_eq!(storage.len(store).await.unwrap(), Some(0));
    }

    // A second call still reaches the network.
    cache_or_network(&ctx, &request).await.unwrap();
    assert_eq!(network.calls_to("/manifest.json"), 2);
}

#[tokio::test]
async fn test_cache_or_network_prefers_any_store() {
    let storage = opened_storage("v3").await;
    let network = FakeNetwork::new();
    let ctx = context(storage.clone(), network.clone());
    let request = FetchRequest::get("/manifest.json");
    storage
        .put(PRECACHE, &request.cache_key(), &FetchResponse::new(200, "{\"name\":\"store\"}"))
        .await
        .unwrap();

    let served = cache_or_network(&ctx, &request).await.unwrap();
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(network.calls_to("/manifest.json"), 0);
}

#[tokio::test]
async fn test_cache_or_network_offline_miss_is_error() {
    let network = FakeNetwork::new();
    network.set_offline(true);
    let ctx = context(opened_storage("v3").await, network);
    assert!(cache_or_network(&ctx, &FetchRequest::get("/placeholder-bg.mp4"))
        .await
        .is_err());
}
