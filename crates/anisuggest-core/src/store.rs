//! Persistent key/value store backing the suggestion cache.
//!
//! Values are kept as raw JSON so a value with an unexpected shape survives
//! storage and can be judged (and ignored) by the cache layer. Size
//! accounting mirrors browser extension storage: every entry costs the
//! length of its key plus the length of its JSON serialization.

use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Asynchronous key/value storage.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read one key.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Read every entry.
    async fn get_all(&self) -> Result<BTreeMap<String, Value>>;

    /// Upsert a batch of entries in one step.
    async fn set(&self, entries: BTreeMap<String, Value>) -> Result<()>;

    /// Remove keys; missing keys are ignored.
    async fn remove(&self, keys: &[String]) -> Result<()>;

    /// Remove everything.
    async fn clear(&self) -> Result<()>;

    /// Bytes used by all entries.
    async fn bytes_in_use(&self) -> Result<u64>;
}

/// Size of one entry as counted against the quota.
pub fn entry_size(key: &str, value: &Value) -> u64 {
    let value_len = serde_json::to_vec(value).map_or(0, |bytes| bytes.len());
    (key.len() + value_len) as u64
}

fn total_size(entries: &BTreeMap<String, Value>) -> u64 {
    entries.iter().map(|(k, v)| entry_size(k, v)).sum()
}

/// In-process store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn get_all(&self) -> Result<BTreeMap<String, Value>> {
        Ok(self.entries.read().await.clone())
    }

    async fn set(&self, entries: BTreeMap<String, Value>) -> Result<()> {
        self.entries.write().await.extend(entries);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let mut map = self.entries.write().await;
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn bytes_in_use(&self) -> Result<u64> {
        Ok(total_size(&*self.entries.read().await))
    }
}

/// Durable store kept as a single JSON document.
///
/// The whole document is loaded at open and rewritten after every mutation
/// through a temp file and a rename, so a crash never leaves a torn file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, Value>>,
}

impl FileStore {
    /// Open (or start) the store at `path`, creating parent directories.
    ///
    /// A file that cannot be parsed is logged and treated as empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("Failed to create store directory: {e}")))?;
        }

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<BTreeMap<String, Value>>(&bytes)
                .unwrap_or_else(|e| {
                    warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                    BTreeMap::new()
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("Opened cache file {} with {} entries", path.display(), entries.len());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        let json = serde_json::to_vec(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write cache file: {e}")))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to commit cache file: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn get_all(&self) -> Result<BTreeMap<String, Value>> {
        Ok(self.entries.read().await.clone())
    }

    async fn set(&self, entries: BTreeMap<String, Value>) -> Result<()> {
        let mut map = self.entries.write().await;
        map.extend(entries);
        self.persist(&map).await
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let mut map = self.entries.write().await;
        let before = map.len();
        for key in keys {
            map.remove(key);
        }
        if map.len() == before {
            return Ok(());
        }
        self.persist(&map).await
    }

    async fn clear(&self) -> Result<()> {
        let mut map = self.entries.write().await;
        map.clear();
        self.persist(&map).await
    }

    async fn bytes_in_use(&self) -> Result<u64> {
        Ok(total_size(&*self.entries.read().await))
    }
}
