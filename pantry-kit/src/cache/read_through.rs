//! Read-through recipe cache with request coalescing

use crate::cache::{
    coalesce::Coalescer,
    config::CacheConfig,
    pagination::{paginate, Page},
    store::{start_auto_cleanup, RecipeStore},
    types::{CacheStats, CacheValue},
};
use crate::client::RecipeGenerator;
use crate::error::{PantryError, Result};
use crate::model::{IngredientSet, Recipe};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Default)]
struct Counters {
    upstream_calls: AtomicU64,
    coalesced_waits: AtomicU64,
}

/// One page of suggestions in the shape a UI layer consumes
///
/// Failures are folded into `success`/`error` instead of an `Err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub page: Page<Recipe>,
    pub success: bool,
    pub error: Option<String>,
    pub generation_time_ms: u64,
}

/// Cache in front of a [`RecipeGenerator`]
///
/// `get` answers from the store when it can. On a miss, concurrent callers
/// for the same ingredient set share one generator call. Only successful
/// results are stored; a failure reaches every waiting caller and leaves
/// nothing behind, so the next call tries upstream again.
#[derive(Clone)]
pub struct RecipeCache {
    store: RecipeStore,
    generator: Arc<dyn RecipeGenerator>,
    flights: Coalescer<CacheValue>,
    counters: Arc<Counters>,
}

impl RecipeCache {
    /// In-memory cache
    pub fn new(config: CacheConfig, generator: Arc<dyn RecipeGenerator>) -> Self {
        Self::with_store(RecipeStore::new(config), generator)
    }

    /// Cache persisted under `dir`
    pub async fn with_disk(
        config: CacheConfig,
        dir: impl Into<PathBuf>,
        generator: Arc<dyn RecipeGenerator>,
    ) -> Result<Self> {
        let store = RecipeStore::with_disk(config, dir).await?;
        Ok(Self::with_store(store, generator))
    }

    pub fn with_store(store: RecipeStore, generator: Arc<dyn RecipeGenerator>) -> Self {
        Self {
            store,
            generator,
            flights: Coalescer::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn store(&self) -> &RecipeStore {
        &self.store
    }

    /// Start the periodic expiry sweep if the config enables it
    pub fn spawn_auto_cleanup(&self) -> Option<JoinHandle<()>> {
        if self.store.config().enable_auto_cleanup {
            Some(tokio::spawn(start_auto_cleanup(self.store.clone())))
        } else {
            None
        }
    }

    /// Cached or freshly generated result for `ingredients`
    pub async fn get(&self, ingredients: &IngredientSet) -> Result<CacheValue> {
        if ingredients.is_empty() {
            return Err(PantryError::Validation(
                "Add at least one ingredient to get recipe ideas.".to_string(),
            ));
        }

        let key = ingredients.cache_key();
        if let Some(hit) = self.store.get(&key).await? {
            return Ok(hit);
        }

        let store = self.store.clone();
        let generator = self.generator.clone();
        let counters = self.counters.clone();
        let set = ingredients.clone();
        let fetch_key = key.clone();

        let flight = self
            .flights
            .join_or_start(&key, move || async move {
                // Another fetch may have stored this key between our miss
                // and taking the in-flight lock.
                if let Some(hit) = store.peek(&fetch_key).await {
                    return Ok(hit);
                }

                counters.upstream_calls.fetch_add(1, Ordering::Relaxed);
                let result = Arc::new(generator.generate(&set).await?);

                if result.success {
                    store.insert(fetch_key, result.clone()).await?;
                } else {
                    debug!("Not caching unsuccessful result: {}", fetch_key);
                }
                Ok(result)
            })
            .await;

        if flight.is_joined() {
            self.counters.coalesced_waits.fetch_add(1, Ordering::Relaxed);
        }

        match flight.wait().await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(key = %key, "Recipe generation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Page of recipes for `ingredients`, highlighted against that set
    ///
    /// `page_size` falls back to the configured default.
    pub async fn get_page(
        &self,
        ingredients: &IngredientSet,
        page: usize,
        page_size: Option<usize>,
    ) -> Result<Page<Recipe>> {
        let page_size = page_size.unwrap_or(self.store.config().default_page_size);
        let result = self.get(ingredients).await?;
        let page = paginate(&result.recipes, page, page_size)?;
        Ok(page.map(|recipe| recipe.with_highlights(ingredients)))
    }

    /// Like [`RecipeCache::get_page`] but never fails: errors come back as
    /// an unsuccessful [`Suggestions`] carrying a user-facing message
    pub async fn suggest(
        &self,
        ingredients: &IngredientSet,
        page: usize,
        page_size: Option<usize>,
    ) -> Suggestions {
        let size = page_size.unwrap_or(self.store.config().default_page_size);

        let outcome = async {
            let result = self.get(ingredients).await?;
            let page = paginate(&result.recipes, page, size)?;
            Ok::<_, PantryError>((page, result.generation_time_ms))
        }
        .await;

        match outcome {
            Ok((page, generation_time_ms)) => Suggestions {
                page: page.map(|recipe| recipe.with_highlights(ingredients)),
                success: true,
                error: None,
                generation_time_ms,
            },
            Err(e) => Suggestions {
                page: Page {
                    items: Vec::new(),
                    page,
                    page_size: size,
                    total_items: 0,
                    total_pages: 0,
                    has_next_page: false,
                    has_previous_page: false,
                },
                success: false,
                error: Some(e.user_message()),
                generation_time_ms: 0,
            },
        }
    }

    /// Drop the cached result for `ingredients`
    pub async fn invalidate(&self, ingredients: &IngredientSet) -> Result<bool> {
        let removed = self.store.remove(&ingredients.cache_key()).await?;
        Ok(removed.is_some())
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await?;
        info!("Recipe cache cleared");
        Ok(())
    }

    /// Store statistics plus upstream and coalescing counters
    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.store.stats().await;
        stats.upstream_calls = self.counters.upstream_calls.load(Ordering::Relaxed);
        stats.coalesced_waits = self.counters.coalesced_waits.load(Ordering::Relaxed);
        stats
    }

    /// Number of generator calls currently in flight
    pub async fn in_flight(&self) -> usize {
        self.flights.in_flight_count().await
    }
}
