//! Recipe store with TTL expiry, first-in-first-out eviction and optional
//! disk persistence

use crate::cache::{
    config::CacheConfig,
    disk::DiskStore,
    entry::CacheEntry,
    types::{CacheKey, CacheStats, CacheValue},
};
use crate::error::Result;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

/// Keyed store of recipe results
///
/// - Thread-safe async access via RwLock
/// - Entries older than the configured TTL read as misses and are dropped
/// - Beyond `max_entries`, the oldest inserted entries are evicted first
/// - When opened with a directory, every change is mirrored to disk
///
/// Lock order is `disk_guard` then `state`. The disk guard is held from the
/// memory change through the matching file operation, so the directory
/// always ends up agreeing with memory.
#[derive(Clone)]
pub struct RecipeStore {
    pub(crate) config: CacheConfig,

    state: Arc<RwLock<StoreState>>,

    disk: Option<DiskStore>,

    disk_guard: Arc<Mutex<()>>,
}

/// Internal cache storage
struct StoreState {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, CacheEntry>,

    /// Insertion order, oldest at the front
    order: VecDeque<CacheKey>,

    /// Current cache statistics
    stats: CacheStats,
}

impl StoreState {
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        self.stats.entries = self.entries.len();
        Some(entry)
    }

    /// Evict oldest entries until there is room for one more
    fn evict_for_insert(&mut self, max_entries: usize) -> Vec<CacheKey> {
        let mut evicted = Vec::new();
        while self.entries.len() >= max_entries {
            let Some(key) = self.order.pop_front() else {
                break;
            };
            if self.entries.remove(&key).is_some() {
                debug!("Evicting entry due to max_entries limit: {}", key);
                self.stats.evictions_capacity += 1;
                evicted.push(key);
            }
        }
        self.stats.entries = self.entries.len();
        evicted
    }
}

impl RecipeStore {
    /// Create an in-memory store
    pub fn new(config: CacheConfig) -> Self {
        info!("Initializing recipe store with config: {:?}", config);

        let state = StoreState {
            entries: HashMap::new(),
            order: VecDeque::new(),
            stats: CacheStats::default(),
        };

        Self {
            config,
            state: Arc::new(RwLock::new(state)),
            disk: None,
            disk_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Create a store persisted under `dir` and load what is already there
    pub async fn with_disk(config: CacheConfig, dir: impl Into<PathBuf>) -> Result<Self> {
        let disk = DiskStore::open(dir).await?;
        let mut store = Self::new(config);
        store.disk = Some(disk);
        store.load().await?;
        Ok(store)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Serialize disk changes; `None` for in-memory stores
    async fn lock_disk(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.disk {
            Some(_) => Some(self.disk_guard.lock().await),
            None => None,
        }
    }

    /// Reload entries from disk, oldest first, applying the entry cap
    ///
    /// Returns the number of entries held after loading.
    pub async fn load(&self) -> Result<usize> {
        let Some(disk) = &self.disk else {
            return Ok(self.len().await);
        };

        let _disk_guard = self.disk_guard.lock().await;
        let loaded = disk.load_all().await?;
        let mut state = self.state.write().await;
        let mut evicted = Vec::new();

        for entry in loaded {
            let key = entry.key.clone();
            if state.remove_entry(&key).is_none() {
                evicted.extend(state.evict_for_insert(self.config.max_entries));
            }
            state.entries.insert(key.clone(), entry);
            state.order.push_back(key);
        }
        state.stats.entries = state.entries.len();
        let count = state.entries.len();
        drop(state);

        disk.delete_many(&evicted).await;
        info!(entries = count, dir = %disk.dir().display(), "Loaded recipe cache from disk");
        Ok(count)
    }

    /// Insert a value, evicting the oldest entries if the store is full
    pub async fn insert(&self, key: CacheKey, value: CacheValue) -> Result<()> {
        let ttl = self.config.ttl_with_jitter();
        let entry = CacheEntry::new(key.clone(), value, ttl);

        let _disk_guard = self.lock_disk().await;
        let mut state = self.state.write().await;

        let evicted = if state.remove_entry(&key).is_some() {
            debug!("Replacing existing cache entry: {}", key);
            Vec::new()
        } else {
            debug!("Inserting new cache entry: {}", key);
            state.evict_for_insert(self.config.max_entries)
        };

        state.entries.insert(key.clone(), entry.clone());
        state.order.push_back(key);
        state.stats.entries = state.entries.len();
        drop(state);

        if let Some(disk) = &self.disk {
            disk.delete_many(&evicted).await;
            if let Err(e) = disk.write(&entry).await {
                warn!(key = %entry.key, "Failed to persist cache entry: {}", e);
            }
        }

        Ok(())
    }

    /// Get a value; expired entries are dropped and reported as misses
    pub async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let expired = match state.entries.get_mut(key) {
            Some(entry) if entry.is_expired() => true,
            Some(entry) => {
                entry.mark_accessed();
                if self.config.enable_metrics {
                    state.stats.hits += 1;
                }
                debug!("Cache hit: {}", key);
                return Ok(Some(entry.value.clone()));
            }
            None => false,
        };

        if self.config.enable_metrics {
            state.stats.misses += 1;
        }

        if expired {
            debug!("Cache entry expired: {}", key);
            state.stats.evictions_ttl += 1;
            state.remove_entry(key);
            drop(guard);

            let _disk_guard = self.lock_disk().await;
            // An insert may have landed between dropping the state lock and
            // taking the disk guard; its file must survive.
            if !self.state.read().await.entries.contains_key(key) {
                self.delete_file(key).await;
            }
        } else {
            debug!("Cache miss: {}", key);
        }

        Ok(None)
    }

    /// Live value for `key` without touching stats or access metadata
    pub async fn peek(&self, key: &str) -> Option<CacheValue> {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|e| !e.is_expired())
            .map(|e| e.value.clone())
    }

    /// Check if a live entry exists (without touching stats or access time)
    pub async fn contains_key(&self, key: &str) -> bool {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .map(|e| !e.is_expired())
            .unwrap_or(false)
    }

    /// Remove a specific entry
    pub async fn remove(&self, key: &str) -> Result<Option<CacheValue>> {
        let _disk_guard = self.lock_disk().await;
        let mut state = self.state.write().await;
        let removed = state.remove_entry(key);
        if removed.is_some() {
            state.stats.invalidations += 1;
        }
        drop(state);

        if let Some(disk) = &self.disk {
            disk.delete(key).await?;
        }

        Ok(removed.map(|e| {
            debug!("Removed cache entry: {}", key);
            e.value
        }))
    }

    /// Clear all entries, in memory and on disk
    pub async fn clear(&self) -> Result<()> {
        let _disk_guard = self.lock_disk().await;
        let mut state = self.state.write().await;

        let count = state.entries.len();
        state.entries.clear();
        state.order.clear();
        state.stats.entries = 0;
        state.stats.invalidations += count as u64;
        drop(state);

        if let Some(disk) = &self.disk {
            disk.clear().await?;
        }

        info!("Cleared {} entries from recipe cache", count);
        Ok(())
    }

    /// Remove all expired entries; returns the removed keys
    pub async fn cleanup_expired(&self) -> Result<Vec<CacheKey>> {
        let _disk_guard = self.lock_disk().await;
        let mut state = self.state.write().await;

        let expired_keys: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            state.remove_entry(key);
        }
        state.stats.evictions_ttl += expired_keys.len() as u64;
        drop(state);

        if !expired_keys.is_empty() {
            if let Some(disk) = &self.disk {
                disk.delete_many(&expired_keys).await;
            }
            debug!("Cleaned up {} expired entries", expired_keys.len());
        }

        Ok(expired_keys)
    }

    /// Keys in insertion order, oldest first
    pub async fn keys(&self) -> Vec<CacheKey> {
        let state = self.state.read().await;
        state.order.iter().cloned().collect()
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        state.stats.clone()
    }

    /// Get number of entries in cache
    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.entries.len()
    }

    /// Check if cache is empty
    pub async fn is_empty(&self) -> bool {
        let state = self.state.read().await;
        state.entries.is_empty()
    }

    async fn delete_file(&self, key: &str) {
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.delete(key).await {
                warn!(key = %key, "Failed to delete cache file: {}", e);
            }
        }
    }
}

/// Background task for automatic cache cleanup
pub async fn start_auto_cleanup(store: RecipeStore) {
    let interval = store.config.cleanup_interval;

    info!("Starting automatic cache cleanup task (interval: {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;

        match store.cleanup_expired().await {
            Ok(keys) => {
                if !keys.is_empty() {
                    debug!("Auto cleanup removed {} entries", keys.len());
                }
            }
            Err(e) => {
                warn!("Auto cleanup failed: {}", e);
            }
        }
    }
}
