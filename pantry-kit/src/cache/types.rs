//! Core type definitions for the recipe cache

use crate::model::RecipeResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Cache key type, derived from a canonical ingredient set
pub type CacheKey = String;

/// Cached value type, shared between the store and every reader
pub type CacheValue = Arc<RecipeResult>;

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,

    /// Number of entries currently in cache
    pub entries: usize,

    /// Number of evictions due to the entry cap (oldest first)
    pub evictions_capacity: u64,

    /// Number of evictions due to TTL expiration
    pub evictions_ttl: u64,

    /// Number of manual invalidations
    pub invalidations: u64,

    /// Calls made to the recipe generator
    pub upstream_calls: u64,

    /// Callers that waited on another caller's in-flight fetch
    pub coalesced_waits: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    /// Calculate total evictions
    pub fn total_evictions(&self) -> u64 {
        self.evictions_capacity + self.evictions_ttl
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, evictions: {}, upstream_calls: {}, coalesced: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.entries,
            self.total_evictions(),
            self.upstream_calls,
            self.coalesced_waits
        )
    }
}
