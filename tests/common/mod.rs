// Shared test helpers: a scripted origin and manager construction
// Author: storecache contributors

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storecache::cache::{CacheNames, CacheStorage, MemoryCacheStorage};
use storecache::config::{CacheConfig, StorageBackend};
use storecache::error::{ProxyError, Result};
use storecache::models::{FetchRequest, FetchResponse};
use storecache::network::Network;
use storecache::worker::{CacheManager, StrategyContext};
use tokio::sync::Notify;

/// An origin answering from a fixed table. Unknown paths are 404s; when
/// offline every fetch fails. Conditional requests for a known path get a
/// 304, as if the validator always matched.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, FetchResponse>>,
    offline: AtomicBool,
    calls: Mutex<Vec<(String, String)>>,
    sent_headers: Mutex<Vec<Vec<(String, String)>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .insert(url.to_string(), FetchResponse::new(status, body.to_string()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|(_, u)| u == url).count()
    }

    /// Headers of every request received, in order.
    pub fn sent_headers(&self) -> Vec<Vec<(String, String)>> {
        self.sent_headers.lock().clone()
    }

    /// Hold the next fetch of `url` until the returned handle is notified.
    pub fn hold(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(url.to_string(), gate.clone());
        gate
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        self.calls.lock().push((request.method.clone(), request.url.clone()));
        self.sent_headers.lock().push(request.headers.clone());

        let gate = self.gates.lock().remove(&request.url);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(ProxyError::Network(format!("offline: {}", request.url)));
        }
        let conditional =
            request.header("if-none-match").is_some() || request.header("if-modified-since").is_some();
        Ok(match self.routes.lock().get(&request.url) {
            Some(_) if conditional => FetchResponse::new(304, ""),
            Some(response) => response.clone(),
            None => FetchResponse::new(404, "not found"),
        })
    }
}

pub fn cache_config(version: &str, precache: &[&str]) -> CacheConfig {
    CacheConfig {
        version: version.to_string(),
        precache: precache.iter().map(|p| p.to_string()).collect(),
        precache_attempts: 1,
        backend: StorageBackend::Memory,
        ..CacheConfig::default()
    }
}

pub fn manager(
    config: CacheConfig,
    storage: Arc<MemoryCacheStorage>,
    network: Arc<FakeNetwork>,
) -> CacheManager {
    CacheManager::new(config, storage, network)
}

pub fn context(storage: Arc<MemoryCacheStorage>, network: Arc<FakeNetwork>) -> StrategyContext {
    StrategyContext::new(storage, network)
}

/// Storage with every store of `version` already open, as install and the
/// manager leave them before a strategy runs.
pub async fn opened_storage(version: &str) -> Arc<MemoryCacheStorage> {
    let storage = Arc::new(MemoryCacheStorage::new());
    for name in CacheNames::new("bdm-", version).all() {
        storage.open(&name).await.unwrap();
    }
    storage
}

pub async fn store_names(storage: &MemoryCacheStorage) -> Vec<String> {
    let mut names = storage.keys().await.unwrap();
    names.sort();
    names
}
