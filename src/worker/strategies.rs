//! Caching strategies.
//!
//! Each strategy is a free function receiving the storage and network it
//! works against through [`StrategyContext`], plus the name of the store it
//! reads and writes. None of them holds state between calls. On a miss in
//! their own store, stale-while-revalidate and cache-first look in every
//! other store, which is how precached assets are served.
//!
//! Strategies never open their store; the caller does, while the store's
//! generation is still active. A write to a store purged in the meantime
//! is dropped by the storage.
//!
//! Only 2xx responses are ever written. Storage errors never fail a fetch:
//! a failed read is a miss and a failed write is logged and dropped.

// Author: storecache contributors

use crate::cache::CacheStorage;
use crate::error::Result;
use crate::metrics;
use crate::models::{CacheKey, FetchRequest, FetchResponse};
use crate::network::Network;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What a strategy works against.
#[derive(Clone)]
pub struct StrategyContext {
    pub storage: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
}

impl StrategyContext {
    pub fn new(storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self { storage, network }
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    OfflineFallback,
    /// Nothing could be served; the response is the network-error indicator.
    Unavailable,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::OfflineFallback => "offline-fallback",
            ResponseSource::Unavailable => "unavailable",
        }
    }
}

/// A strategy's answer.
#[derive(Debug)]
pub struct Served {
    pub response: FetchResponse,
    pub source: ResponseSource,
    /// Background refresh started by stale-while-revalidate. Dropping the
    /// handle detaches the task; awaiting it waits for the cache update.
    pub revalidation: Option<JoinHandle<()>>,
}

impl Served {
    fn new(response: FetchResponse, source: ResponseSource) -> Self {
        Self {
            response,
            source,
            revalidation: None,
        }
    }
}

/// Documents tried, in order, when a navigation cannot reach the network.
#[derive(Debug, Clone)]
pub struct OfflineFallback {
    pub offline_url: String,
    pub root_fallback: String,
}

/// The strategy's own store first, then any other store. A precached copy
/// serves until the runtime store holds its own.
async fn lookup_own_or_any(storage: &dyn CacheStorage, store: &str, key: &CacheKey) -> Option<FetchResponse> {
    match storage.get(store, key).await {
        Ok(Some(response)) => {
            metrics::record_cache_hit();
            return Some(response);
        }
        Ok(None) => {}
        Err(e) => warn!("Reading {} from {} failed: {}", key, store, e),
    }
    lookup_any(storage, key).await
}

async fn lookup_any(storage: &dyn CacheStorage, key: &CacheKey) -> Option<FetchResponse> {
    match storage.match_any(key).await {
        Ok(hit) => {
            if hit.is_some() {
                metrics::record_cache_hit();
            } else {
                metrics::record_cache_miss();
            }
            hit
        }
        Err(e) => {
            warn!("Matching {} across stores failed, treating as miss: {}", key, e);
            metrics::record_cache_miss();
            None
        }
    }
}

async fn store_if_ok(storage: &dyn CacheStorage, store: &str, key: &CacheKey, response: &FetchResponse) {
    if !response.is_ok() {
        debug!("Not caching {} ({})", key, response.status);
        return;
    }
    match storage.put(store, key, response).await {
        Ok(()) => metrics::record_cache_put(),
        Err(e) => warn!("Writing {} to {} failed: {}", key, store, e),
    }
}

/// Network first, offline fallback chain on network failure.
///
/// Always produces a response: the live one, the cached offline document,
/// the cached root document, or a synthetic 503.
pub async fn network_first(
    ctx: &StrategyContext,
    store: &str,
    fallback: &OfflineFallback,
    request: &FetchRequest,
) -> Served {
    let key = request.cache_key();

    match ctx.network.fetch(request).await {
        Ok(response) => {
            store_if_ok(ctx.storage.as_ref(), store, &key, &response).await;
            Served::new(response, ResponseSource::Network)
        }
        Err(e) => {
            debug!("Navigation to {} failed, serving offline fallback: {}", request.url, e);
            for url in [&fallback.offline_url, &fallback.root_fallback] {
                if let Some(cached) = lookup_any(ctx.storage.as_ref(), &CacheKey::get(url)).await {
                    return Served::new(cached, ResponseSource::OfflineFallback);
                }
            }
            Served::new(FetchResponse::offline(), ResponseSource::OfflineFallback)
        }
    }
}

/// Serve the cached entry now, refresh it in the background.
///
/// Without a cached entry the caller waits for the network, and a network
/// failure is returned as an error.
pub async fn stale_while_revalidate(
    ctx: &StrategyContext,
    store: &str,
    request: &FetchRequest,
) -> Result<Served> {
    let key = request.cache_key();

    match lookup_own_or_any(ctx.storage.as_ref(), store, &key).await {
        Some(cached) => {
            let revalidation = tokio::spawn(revalidate(ctx.clone(), store.to_string(), request.clone()));
            Ok(Served {
                response: cached,
                source: ResponseSource::Cache,
                revalidation: Some(revalidation),
            })
        }
        None => {
            let response = ctx.network.fetch(request).await?;
            store_if_ok(ctx.storage.as_ref(), store, &key, &response).await;
            Ok(Served::new(response, ResponseSource::Network))
        }
    }
}

async fn revalidate(ctx: StrategyContext, store: String, request: FetchRequest) {
    metrics::record_revalidation();
    match ctx.network.fetch(&request).await {
        Ok(response) => {
            store_if_ok(ctx.storage.as_ref(), &store, &request.cache_key(), &response).await;
        }
        Err(e) => debug!("Revalidating {} failed, keeping cached copy: {}", request.url, e),
    }
}

/// Cached entry if present, otherwise the network.
///
/// A network failure with nothing cached yields the network-error
/// indicator response rather than an error.
pub async fn cache_first(ctx: &StrategyContext, store: &str, request: &FetchRequest) -> Served {
    let key = request.cache_key();

    if let Some(cached) = lookup_own_or_any(ctx.storage.as_ref(), store, &key).await {
        return Served::new(cached, ResponseSource::Cache);
    }

    match ctx.network.fetch(request).await {
        Ok(response) => {
            store_if_ok(ctx.storage.as_ref(), store, &key, &response).await;
            Served::new(response, ResponseSource::Network)
        }
        Err(e) => {
            debug!("{} unavailable: {}", request.url, e);
            Served::new(FetchResponse::network_error(), ResponseSource::Unavailable)
        }
    }
}

/// Any store's entry, otherwise the network. Never writes.
pub async fn cache_or_network(ctx: &StrategyContext, request: &FetchRequest) -> Result<Served> {
    if let Some(cached) = lookup_any(ctx.storage.as_ref(), &request.cache_key()).await {
        return Ok(Served::new(cached, ResponseSource::Cache));
    }

    let response = ctx.network.fetch(request).await?;
    Ok(Served::new(response, ResponseSource::Network))
}
