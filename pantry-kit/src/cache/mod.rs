//! # Recipe Result Cache
//!
//! A read-through cache in front of the recipe generator.
//!
//! ## Features
//!
//! - **Canonical keys**: ingredient sets that differ only in order, case or
//!   spacing share one entry
//! - **TTL-Based Expiration**: entries older than the TTL (24 hours by
//!   default) read as misses and trigger regeneration
//! - **FIFO Eviction**: beyond `max_entries` the oldest entries go first
//! - **Disk Persistence**: optional, one JSON file per entry
//! - **Request Coalescing**: concurrent misses for one key make a single
//!   upstream call
//! - **Pagination**: deterministic page slices over a cached result
//!
//! ## Example
//!
//! ```no_run
//! use pantry_kit::cache::{CacheConfig, RecipeCache};
//! use pantry_kit::client::HttpRecipeGenerator;
//! use pantry_kit::{IngredientSet, ServiceConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let service = ServiceConfig::from_env()?;
//! let generator = Arc::new(HttpRecipeGenerator::from_config(&service)?);
//! let cache = RecipeCache::new(CacheConfig::default(), generator);
//!
//! let ingredients = IngredientSet::new(["eggs", "tomato", "basil"]);
//! let page = cache.get_page(&ingredients, 1, None).await?;
//! for recipe in &page.items {
//!     println!("{} ({:.0}% match)", recipe.title, recipe.match_percentage);
//! }
//! # Ok(())
//! # }
//! ```

pub mod coalesce;
pub mod config;
pub mod disk;
pub mod entry;
pub mod pagination;
pub mod read_through;
pub mod store;
pub mod types;

pub use coalesce::{Coalescer, Flight};
pub use config::{CacheConfig, CacheConfigBuilder};
pub use disk::DiskStore;
pub use entry::{CacheEntry, CacheMetadata};
pub use pagination::{paginate, Page};
pub use read_through::{RecipeCache, Suggestions};
pub use store::{start_auto_cleanup, RecipeStore};
pub use types::{CacheKey, CacheStats, CacheValue};
