//! Disk-backed cache storage.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<hex(store name)>/store.json      store metadata (name, creation time)
//! <root>/<hex(store name)>/<sha256>.entry  one file per cached request
//! ```
//!
//! An entry file is a single JSON metadata line followed by the raw body.
//! Writes go to a temporary file that is renamed into place, so readers see
//! either the previous entry or the new one, never a torn write.

// Author: storecache contributors

use super::storage::CacheStorage;
use crate::error::{ProxyError, Result};
use crate::models::{CacheKey, FetchResponse};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, warn};

const STORE_META: &str = "store.json";
const ENTRY_EXT: &str = "entry";

#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: CacheKey,
    status: u16,
    headers: Vec<(String, String)>,
    stored_at: DateTime<Utc>,
}

/// Cache storage persisted on the local filesystem.
pub struct DiskCacheStorage {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl DiskCacheStorage {
    /// Use `root` as the storage directory, creating it when needed.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        debug!("Disk cache storage at {}", root.display());
        Ok(Self {
            root,
            tmp_counter: AtomicU64::new(0),
        })
    }

    fn store_dir(&self, name: &str) -> PathBuf {
        self.root.join(hex::encode(name.as_bytes()))
    }

    fn entry_path(&self, name: &str, key: &CacheKey) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.method.as_bytes());
        hasher.update(b" ");
        hasher.update(key.url.as_bytes());
        self.store_dir(name)
            .join(format!("{:x}.{}", hasher.finalize(), ENTRY_EXT))
    }

    async fn write_atomic(&self, dir: &Path, target: &Path, contents: &[u8]) -> Result<()> {
        let tmp = dir.join(format!(
            ".tmp-{}-{}",
            std::process::id(),
            self.tmp_counter.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&tmp, contents).await?;
        if let Err(e) = fs::rename(&tmp, target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read_store_meta(&self, dir: &Path) -> Option<StoreMeta> {
        let raw = fs::read(dir.join(STORE_META)).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!("Ignoring store with unreadable metadata {}: {}", dir.display(), e);
                None
            }
        }
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<()> {
        let dir = self.store_dir(name);
        if fs::try_exists(dir.join(STORE_META)).await? {
            return Ok(());
        }

        fs::create_dir_all(&dir).await?;
        let meta = StoreMeta {
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.write_atomic(&dir, &dir.join(STORE_META), &serde_json::to_vec(&meta)?)
            .await?;
        debug!("Created store {}", name);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut stores = Vec::new();
        let mut dirs = fs::read_dir(&self.root).await?;
        while let Some(entry) = dirs.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(meta) = self.read_store_meta(&entry.path()).await {
                stores.push(meta);
            }
        }

        stores.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(stores.into_iter().map(|meta| meta.name).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        match fs::remove_dir_all(self.store_dir(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, name: &str, key: &CacheKey) -> Result<Option<FetchResponse>> {
        let raw = match fs::read(self.entry_path(name, key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let split = raw
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| ProxyError::Storage(format!("corrupt entry for {}", key)))?;
        let meta: EntryMeta = serde_json::from_slice(&raw[..split])?;

        // Different keys hashing to the same file would be a miss, not a hit.
        if meta.key != *key {
            return Ok(None);
        }

        Ok(Some(FetchResponse {
            status: meta.status,
            headers: meta.headers,
            body: Bytes::copy_from_slice(&raw[split + 1..]),
        }))
    }

    async fn put(&self, name: &str, key: &CacheKey, response: &FetchResponse) -> Result<()> {
        let dir = self.store_dir(name);
        if !fs::try_exists(dir.join(STORE_META)).await? {
            debug!("Dropping write of {} to missing store {}", key, name);
            return Ok(());
        }

        let meta = EntryMeta {
            key: key.clone(),
            status: response.status,
            headers: response.headers.clone(),
            stored_at: Utc::now(),
        };
        let mut contents = serde_json::to_vec(&meta)?;
        contents.push(b'\n');
        contents.extend_from_slice(&response.body);

        match self.write_atomic(&dir, &self.entry_path(name, key), &contents).await {
            // Deleted between the check and the write.
            Err(ProxyError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                debug!("Store {} deleted while writing {}", name, key);
                Ok(())
            }
            other => other,
        }
    }

    async fn len(&self, name: &str) -> Result<Option<usize>> {
        let dir = self.store_dir(name);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == ENTRY_EXT) {
                count += 1;
            }
        }
        Ok(Some(count))
    }
}
