//! Request coalescing for concurrent lookups of the same key
//!
//! The first caller for a key starts the work on a spawned task and registers
//! a shared handle to it. Later callers for the same key await that handle
//! instead of starting their own. The marker is removed by the task itself
//! once the work finishes, whatever the outcome, so a failure is delivered
//! to every waiter and the next caller starts fresh.

use crate::cache::types::CacheKey;
use crate::error::{PantryError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T>>>;

/// Map of in-flight operations keyed by cache key
pub struct Coalescer<T: Clone> {
    pending: Arc<Mutex<HashMap<CacheKey, SharedFetch<T>>>>,
}

impl<T: Clone> Clone for Coalescer<T> {
    fn clone(&self) -> Self {
        Self {
            pending: self.pending.clone(),
        }
    }
}

impl<T: Clone> Default for Coalescer<T> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Handle to an in-flight operation
pub struct Flight<T: Clone> {
    joined: bool,
    future: SharedFetch<T>,
}

impl<T: Clone> Flight<T> {
    /// True when this caller joined an operation another caller started
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Wait for the shared outcome
    pub async fn wait(self) -> Result<T> {
        self.future.await
    }
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the operation in flight for `key`, or start one with `start`
    ///
    /// `start` is only called when nothing is in flight for the key.
    pub async fn join_or_start<F, Fut>(&self, key: &str, start: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;

        if let Some(existing) = pending.get(key) {
            debug!("Joining in-flight fetch: {}", key);
            return Flight {
                joined: true,
                future: existing.clone(),
            };
        }

        let work = start();
        let registry = self.pending.clone();
        let owned_key = key.to_string();

        // The marker is inserted below while we still hold the lock, so the
        // task cannot remove it before it exists.
        let handle = tokio::spawn(async move {
            let outcome = work.await;
            registry.lock().await.remove(&owned_key);
            outcome
        });

        let future = async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(PantryError::Other(format!("fetch task failed: {}", e))),
            }
        }
        .boxed()
        .shared();

        pending.insert(key.to_string(), future.clone());
        debug!("Started fetch: {}", key);

        Flight {
            joined: false,
            future,
        }
    }

    /// Whether an operation is currently in flight for `key`
    pub async fn is_in_flight(&self, key: &str) -> bool {
        self.pending.lock().await.contains_key(key)
    }

    /// Number of operations currently in flight
    pub async fn in_flight_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
