//! # Pantry Kit (pantry-kit)
//!
//! Recipe suggestions from the ingredients you have on hand.
//!
//! ## Features
//!
//! - Ingredient detection from photos through a vision-capable chat API
//! - Recipe generation through an OpenAI-compatible chat completion API
//! - A read-through result cache with canonical keys, TTL expiry, FIFO
//!   eviction, disk persistence and request coalescing
//! - Deterministic pagination over cached results
//! - Retry with backoff for transient upstream failures
//! - Local stores for saved recipes and the monthly scan quota
//!
//! ## Suggesting Recipes
//!
//! ```no_run
//! use pantry_kit::{HttpRecipeGenerator, IngredientSet, RecipeCache, ServiceConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServiceConfig::from_env()?;
//!     let generator = Arc::new(HttpRecipeGenerator::from_config(&config)?);
//!     let cache = RecipeCache::new(config.cache.clone(), generator);
//!
//!     let ingredients = IngredientSet::parse("Tomato, eggs, basil");
//!     let suggestions = cache.suggest(&ingredients, 1, Some(5)).await;
//!     if let Some(error) = &suggestions.error {
//!         eprintln!("{}", error);
//!     }
//!     for recipe in &suggestions.page.items {
//!         println!("{} - missing: {:?}", recipe.title, recipe.missing_ingredients);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Detecting Ingredients
//!
//! ```no_run
//! use pantry_kit::{HttpVisionClient, ServiceConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServiceConfig::from_env()?;
//!     let vision = HttpVisionClient::from_config(&config)?;
//!
//!     for item in vision.detect_file(Path::new("fridge.jpg")).await? {
//!         println!("{} ({:.0}%)", item.name, item.confidence * 100.0);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result`] with a [`PantryError`]. Use
//! [`PantryError::is_retryable`] to tell transient failures apart and
//! [`PantryError::user_message`] for text suitable for end users.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;

// Re-export main types for convenience
pub use cache::{
    paginate, CacheConfig, CacheConfigBuilder, CacheEntry, CacheKey, CacheMetadata, CacheStats,
    CacheValue, Page, RecipeCache, RecipeStore, Suggestions,
};
pub use client::{
    Backoff, HttpRecipeGenerator, HttpVisionClient, IngredientDetector, RecipeGenerator,
    RetryPolicy,
};
pub use config::{ApiEndpoint, ServiceConfig};
pub use error::{PantryError, Result};
pub use model::{
    DetectedIngredient, IngredientCategory, IngredientSet, NutritionFacts, Recipe,
    RecipeIngredient, RecipeResult,
};
pub use storage::{SavedRecipe, SavedRecipeBook, UsageTracker};
