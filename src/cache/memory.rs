// In-memory cache storage
// Author: storecache contributors

use super::storage::CacheStorage;
use crate::error::Result;
use crate::models::{CacheKey, FetchResponse};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type Store = HashMap<CacheKey, FetchResponse>;

/// Cache storage held in process memory.
///
/// Stores are kept in creation order so `keys` and `match_any` behave like
/// the browser's cache storage. The lock is never held across an await.
#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    stores: Arc<RwLock<Vec<(String, Store)>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<()> {
        let mut stores = self.stores.write();
        if !stores.iter().any(|(n, _)| n == name) {
            debug!("Creating store {}", name);
            stores.push((name.to_string(), Store::new()));
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.stores.read().iter().map(|(n, _)| n.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut stores = self.stores.write();
        let before = stores.len();
        stores.retain(|(n, _)| n != name);
        Ok(stores.len() != before)
    }

    async fn get(&self, name: &str, key: &CacheKey) -> Result<Option<FetchResponse>> {
        let stores = self.stores.read();
        Ok(stores
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, store)| store.get(key).cloned()))
    }

    async fn put(&self, name: &str, key: &CacheKey, response: &FetchResponse) -> Result<()> {
        let mut stores = self.stores.write();
        match stores.iter_mut().find(|(n, _)| n == name) {
            Some((_, store)) => {
                store.insert(key.clone(), response.clone());
            }
            None => debug!("Dropping write of {} to missing store {}", key, name),
        }
        Ok(())
    }

    async fn len(&self, name: &str) -> Result<Option<usize>> {
        let stores = self.stores.read();
        Ok(stores.iter().find(|(n, _)| n == name).map(|(_, store)| store.len()))
    }
}
