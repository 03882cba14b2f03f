//! Integration tests for the read-through recipe cache
//!
//! These tests drive `RecipeCache` with an in-process generator and verify:
//! - Canonical keys
//! - TTL expiration and regeneration
//! - Request coalescing
//! - Failure propagation
//! - Pagination and highlighting
//! - FIFO eviction and disk reload

use async_trait::async_trait;
use pantry_kit::cache::{CacheConfig, RecipeCache};
use pantry_kit::{
    IngredientSet, PantryError, Recipe, RecipeGenerator, RecipeIngredient, RecipeResult, Result,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Generator that counts calls and can be told to fail
struct CountingGenerator {
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    unsuccessful_left: AtomicUsize,
    delay: Duration,
    recipes_per_call: usize,
}

impl CountingGenerator {
    fn new(recipes_per_call: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            unsuccessful_left: AtomicUsize::new(0),
            delay: Duration::from_millis(0),
            recipes_per_call,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn failing(self, times: usize) -> Self {
        self.failures_left.store(times, Ordering::SeqCst);
        self
    }

    /// Answer `Ok` with an unsuccessful result the next `times` calls
    fn unsuccessful(self, times: usize) -> Self {
        self.unsuccessful_left.store(times, Ordering::SeqCst);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeGenerator for CountingGenerator {
    async fn generate(&self, ingredients: &IngredientSet) -> Result<RecipeResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(PantryError::Server {
                status: 503,
                message: "unavailable".to_string(),
            });
        }

        let unsuccessful = self
            .unsuccessful_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if unsuccessful {
            return Ok(RecipeResult::failure(&PantryError::MalformedResponse(
                "no recipes in reply".to_string(),
            )));
        }

        let recipes = (0..self.recipes_per_call)
            .map(|i| {
                Recipe::new(
                    format!("{} dish {}", ingredients, i),
                    vec![
                        RecipeIngredient::new("egg"),
                        RecipeIngredient::with_quantity("flour", "200 g"),
                    ],
                    vec!["Mix".to_string(), "Bake".to_string()],
                )
            })
            .collect();
        Ok(RecipeResult::success(recipes, 12))
    }
}

fn config() -> CacheConfig {
    CacheConfig::builder()
        .default_ttl(Duration::from_secs(60))
        .max_entries(10)
        .ttl_jitter(0.0)
        .default_page_size(2)
        .enable_auto_cleanup(false)
        .build()
}

#[tokio::test]
async fn test_equivalent_ingredient_sets_share_an_entry() {
    let generator = Arc::new(CountingGenerator::new(3));
    let cache = RecipeCache::new(config(), generator.clone());

    let first = cache
        .get(&IngredientSet::new(["Tomato", "egg"]))
        .await
        .unwrap();
    let second = cache
        .get(&IngredientSet::new(["  EGG ", "tomato", "egg"]))
        .await
        .unwrap();

    assert_eq!(generator.calls(), 1);
    assert!(Arc::ptr_eq(&first, &second));

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.upstream_calls, 1);
}

#[tokio::test]
async fn test_expired_entry_is_regenerated() {
    let generator = Arc::new(CountingGenerator::new(1));
    let config = CacheConfig::builder()
        .default_ttl(Duration::from_millis(100))
        .ttl_jitter(0.0)
        .enable_auto_cleanup(false)
        .build();
    let cache = RecipeCache::new(config, generator.clone());
    let ingredients = IngredientSet::parse("rice, beans");

    cache.get(&ingredients).await.unwrap();
    cache.get(&ingredients).await.unwrap();
    assert_eq!(generator.calls(), 1);

    tokio::time::sleep(Duration::from_millis(150)).await;

    cache.get(&ingredients).await.unwrap();
    assert_eq!(generator.calls(), 2);
    assert_eq!(cache.stats().await.evictions_ttl, 1);
}

#[tokio::test]
async fn test_concurrent_misses_make_one_upstream_call() {
    let generator = Arc::new(CountingGenerator::new(2).with_delay(Duration::from_millis(100)));
    let cache = RecipeCache::new(config(), generator.clone());
    let ingredients = IngredientSet::parse("chicken, lemon");

    let mut handles = Vec::new();
    for _ in 0..10 {
        let cache = cache.clone();
        let ingredients = ingredients.clone();
        handles.push(tokio::spawn(async move { cache.get(&ingredients).await }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(generator.calls(), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    assert_eq!(cache.in_flight().await, 0);

    let stats = cache.stats().await;
    assert_eq!(stats.upstream_calls, 1);
    assert!(stats.coalesced_waits >= 1);
}

#[tokio::test]
async fn test_failure_reaches_every_waiter_and_is_not_cached() {
    let generator = Arc::new(
        CountingGenerator::new(2)
            .with_delay(Duration::from_millis(100))
            .failing(1),
    );
    let cache = RecipeCache::new(config(), generator.clone());
    let ingredients = IngredientSet::parse("tofu");

    let (a, b) = tokio::join!(cache.get(&ingredients), cache.get(&ingredients));
    assert!(matches!(a, Err(PantryError::Server { status: 503, .. })));
    assert_eq!(a, b);
    assert_eq!(generator.calls(), 1);
    assert!(cache.store().is_empty().await);

    // Nothing was cached, so the next call goes upstream again
    let retried = cache.get(&ingredients).await.unwrap();
    assert_eq!(retried.recipes.len(), 2);
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_unsuccessful_result_is_returned_but_not_cached() {
    let generator = Arc::new(CountingGenerator::new(2).unsuccessful(1));
    let cache = RecipeCache::new(config(), generator.clone());
    let ingredients = IngredientSet::parse("quinoa");

    let first = cache.get(&ingredients).await.unwrap();
    assert!(!first.success);
    assert!(first.error.is_some());
    assert!(first.recipes.is_empty());
    assert!(cache.store().is_empty().await);

    let second = cache.get(&ingredients).await.unwrap();
    assert!(second.success);
    assert_eq!(second.recipes.len(), 2);
    assert_eq!(generator.calls(), 2);
    assert_eq!(cache.store().len().await, 1);
}

#[tokio::test]
async fn test_fetch_uses_value_stored_after_the_miss() {
    let generator = Arc::new(CountingGenerator::new(1));
    let cache = RecipeCache::new(config(), generator.clone());
    let ingredients = IngredientSet::parse("bread, cheese");
    let stored = Arc::new(RecipeResult::success(Vec::new(), 99));

    // `get` misses and starts its fetch task; the insert lands before that
    // task gets to run on the single-threaded test runtime.
    let (got, inserted) = tokio::join!(
        cache.get(&ingredients),
        cache
            .store()
            .insert(ingredients.cache_key(), stored.clone())
    );
    inserted.unwrap();

    assert!(Arc::ptr_eq(&got.unwrap(), &stored));
    assert_eq!(generator.calls(), 0);
    assert_eq!(cache.stats().await.upstream_calls, 0);
}

#[tokio::test]
async fn test_pages_are_sliced_and_highlighted() {
    let generator = Arc::new(CountingGenerator::new(5));
    let cache = RecipeCache::new(config(), generator.clone());
    let ingredients = IngredientSet::parse("egg, milk");

    let first = cache.get_page(&ingredients, 1, None).await.unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.total_items, 5);
    assert_eq!(first.total_pages, 3);
    assert!(first.has_next_page);
    assert!(!first.has_previous_page);
    assert_eq!(first.items[0].used_ingredients, vec!["egg".to_string()]);
    assert_eq!(first.items[0].missing_ingredients, vec!["flour".to_string()]);
    assert_eq!(first.items[0].match_percentage, 50.0);

    let last = cache.get_page(&ingredients, 3, None).await.unwrap();
    assert_eq!(last.items.len(), 1);
    assert!(!last.has_next_page);
    assert!(last.has_previous_page);

    let past_end = cache.get_page(&ingredients, 4, None).await.unwrap();
    assert!(past_end.is_empty());

    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_invalid_requests() {
    let generator = Arc::new(CountingGenerator::new(1));
    let cache = RecipeCache::new(config(), generator.clone());

    let empty = cache.get(&IngredientSet::parse(" , ")).await;
    assert!(matches!(empty, Err(PantryError::Validation(_))));

    let bad_page = cache.get_page(&IngredientSet::parse("egg"), 0, None).await;
    assert!(matches!(bad_page, Err(PantryError::Validation(_))));

    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_suggest_reports_failures_without_error() {
    let generator = Arc::new(CountingGenerator::new(3).failing(1));
    let cache = RecipeCache::new(config(), generator.clone());
    let ingredients = IngredientSet::parse("pasta");

    let failed = cache.suggest(&ingredients, 1, None).await;
    assert!(!failed.success);
    assert!(failed.error.is_some());
    assert!(failed.page.is_empty());

    let ok = cache.suggest(&ingredients, 2, None).await;
    assert!(ok.success);
    assert_eq!(ok.error, None);
    assert_eq!(ok.page.items.len(), 1);
    assert_eq!(ok.generation_time_ms, 12);
}

#[tokio::test]
async fn test_invalidate_forces_regeneration() {
    let generator = Arc::new(CountingGenerator::new(1));
    let cache = RecipeCache::new(config(), generator.clone());
    let ingredients = IngredientSet::parse("salmon");

    cache.get(&ingredients).await.unwrap();
    assert!(cache.invalidate(&ingredients).await.unwrap());
    assert!(!cache.invalidate(&ingredients).await.unwrap());

    cache.get(&ingredients).await.unwrap();
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_oldest_entry_evicted_first() {
    let generator = Arc::new(CountingGenerator::new(1));
    let config = CacheConfig::builder()
        .max_entries(2)
        .enable_auto_cleanup(false)
        .build();
    let cache = RecipeCache::new(config, generator.clone());

    let a = IngredientSet::parse("a");
    let b = IngredientSet::parse("b");
    let c = IngredientSet::parse("c");

    cache.get(&a).await.unwrap();
    cache.get(&b).await.unwrap();
    // Reading `a` does not protect it from FIFO eviction
    cache.get(&a).await.unwrap();
    cache.get(&c).await.unwrap();

    let keys = cache.store().keys().await;
    assert_eq!(keys, vec![b.cache_key(), c.cache_key()]);
    assert_eq!(cache.stats().await.evictions_capacity, 1);

    cache.get(&a).await.unwrap();
    assert_eq!(generator.calls(), 4);
}

#[tokio::test]
async fn test_disk_cache_survives_restart() {
    let dir = TempDir::new().unwrap();
    let ingredients = IngredientSet::parse("lentils, carrot");

    let first_run = Arc::new(CountingGenerator::new(2));
    let cache = RecipeCache::with_disk(config(), dir.path(), first_run.clone())
        .await
        .unwrap();
    let original = cache.get(&ingredients).await.unwrap();
    assert_eq!(first_run.calls(), 1);
    drop(cache);

    let second_run = Arc::new(CountingGenerator::new(2));
    let cache = RecipeCache::with_disk(config(), dir.path(), second_run.clone())
        .await
        .unwrap();
    let reloaded = cache.get(&ingredients).await.unwrap();

    assert_eq!(second_run.calls(), 0);
    assert_eq!(*reloaded, *original);

    cache.clear().await.unwrap();
    let cache = RecipeCache::with_disk(config(), dir.path(), second_run.clone())
        .await
        .unwrap();
    assert!(cache.store().is_empty().await);
}

#[tokio::test]
async fn test_auto_cleanup_sweeps_expired_entries() {
    let generator = Arc::new(CountingGenerator::new(1));
    let disabled = RecipeCache::new(config(), generator.clone());
    assert!(disabled.spawn_auto_cleanup().is_none());

    let config = CacheConfig::builder()
        .default_ttl(Duration::from_millis(50))
        .ttl_jitter(0.0)
        .enable_auto_cleanup(true)
        .cleanup_interval(Duration::from_millis(20))
        .build();
    let cache = RecipeCache::new(config, generator.clone());
    cache.get(&IngredientSet::parse("kale")).await.unwrap();
    assert_eq!(cache.store().len().await, 1);

    let handle = cache.spawn_auto_cleanup().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.abort();

    assert!(cache.store().is_empty().await);
}
