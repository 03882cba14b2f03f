//! On-disk persistence for cache entries
//!
//! Each entry is one JSON file in the cache directory. File names are a
//! UUIDv5 of the cache key, so they are stable across runs and safe for any
//! ingredient text.

use crate::cache::entry::CacheEntry;
use crate::cache::types::CacheKey;
use crate::error::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const ENTRY_EXTENSION: &str = "json";
const TMP_EXTENSION: &str = "tmp";

/// Directory of serialized cache entries
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// Open (and create if needed) a cache directory
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name = Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes());
        self.dir.join(format!("{}.{}", name, ENTRY_EXTENSION))
    }

    /// Write an entry, replacing any previous file for the same key
    pub async fn write(&self, entry: &CacheEntry) -> Result<()> {
        let path = self.path_for(&entry.key);
        let tmp = path.with_extension(TMP_EXTENSION);
        let bytes = serde_json::to_vec(entry)?;

        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;

        debug!(key = %entry.key, path = %path.display(), "Persisted cache entry");
        Ok(())
    }

    /// Delete the file for `key`; a missing file is not an error
    pub async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete files for several keys, logging failures
    pub async fn delete_many(&self, keys: &[CacheKey]) {
        for key in keys {
            if let Err(e) = self.delete(key).await {
                warn!(key = %key, "Failed to delete cache file: {}", e);
            }
        }
    }

    /// Read every live entry, oldest first
    ///
    /// Expired and unreadable files are deleted.
    pub async fn load_all(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.dir).await?;

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }

            let parsed = match fs::read(&path).await {
                Ok(bytes) => serde_json::from_slice::<CacheEntry>(&bytes).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match parsed {
                Ok(entry) if entry.is_expired() => {
                    debug!(key = %entry.key, "Dropping expired cache file");
                    remove_quietly(&path).await;
                }
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(path = %path.display(), "Dropping unreadable cache file: {}", e);
                    remove_quietly(&path).await;
                }
            }
        }

        entries.sort_by_key(|e| e.metadata.created_at);
        Ok(entries)
    }

    /// Remove every entry file and any leftover partial write; returns how
    /// many entries were removed
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        let mut dir = fs::read_dir(&self.dir).await?;

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some(ENTRY_EXTENSION) => {
                    fs::remove_file(&path).await?;
                    removed += 1;
                }
                Some(TMP_EXTENSION) => fs::remove_file(&path).await?,
                _ => {}
            }
        }

        Ok(removed)
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!(path = %path.display(), "Failed to remove cache file: {}", e);
    }
}
