// Cache storage abstraction
// Author: storecache contributors

use crate::error::Result;
use crate::models::{CacheKey, FetchResponse};
use async_trait::async_trait;

/// A set of named stores, each mapping request identity to a response.
///
/// Every method is a single atomic operation from the caller's point of
/// view. Only `open` creates a store: `put` on a store that does not exist
/// (never opened, or deleted since) is dropped, so a write that outlives
/// its generation cannot bring a purged store back.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the store if it is absent.
    async fn open(&self, name: &str) -> Result<()>;

    /// Names of all existing stores, in creation order.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Remove a store and all of its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Look up an entry in a single store.
    async fn get(&self, name: &str, key: &CacheKey) -> Result<Option<FetchResponse>>;

    /// Insert or overwrite an entry in an existing store.
    async fn put(&self, name: &str, key: &CacheKey, response: &FetchResponse) -> Result<()>;

    /// Number of entries held by a store, `None` when it does not exist.
    async fn len(&self, name: &str) -> Result<Option<usize>>;

    /// Look up an entry in every store, first match in store order wins.
    async fn match_any(&self, key: &CacheKey) -> Result<Option<FetchResponse>> {
        for name in self.keys().await? {
            if let Some(response) = self.get(&name, key).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}
