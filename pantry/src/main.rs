use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use pantry::{render, DataPaths};
use pantry_kit::config::cache_config_from_env;
use pantry_kit::storage::DEFAULT_FREE_MONTHLY_SCANS;
use pantry_kit::{
    DetectedIngredient, HttpRecipeGenerator, HttpVisionClient, IngredientDetector, IngredientSet,
    RecipeCache, RecipeStore, SavedRecipeBook, ServiceConfig, UsageTracker,
};

#[derive(Parser)]
#[command(name = "pantry")]
#[command(about = "Recipe ideas from what is in your kitchen", long_about = None)]
struct Cli {
    /// Data directory (defaults to the platform data directory)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest recipes for a list of ingredients
    Suggest {
        /// Ingredients, separated by spaces or commas
        #[arg(required = true)]
        ingredients: Vec<String>,

        /// Page to show (1-based)
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Recipes per page
        #[arg(long)]
        page_size: Option<usize>,

        /// Save the n-th recipe of the shown page
        #[arg(long)]
        save: Option<usize>,
    },

    /// Detect ingredients in a photo
    Detect {
        /// Image file (jpeg, png, webp, gif or heic)
        image: PathBuf,

        /// Suggest recipes for the detected ingredients
        #[arg(long)]
        suggest: bool,
    },

    /// Inspect or maintain the recipe cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage saved recipes
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },

    /// Show this month's scan usage
    Usage {
        /// Switch to the premium tier (unlimited scans)
        #[arg(long, conflicts_with = "free")]
        premium: bool,

        /// Switch back to the free tier
        #[arg(long)]
        free: bool,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry counts
    Stats,
    /// Delete every cached result
    Clear,
    /// Delete expired results only
    PurgeExpired,
}

#[derive(Subcommand)]
enum SavedAction {
    /// List saved recipes, newest first
    List,
    /// Remove a saved recipe by id
    Remove {
        /// Recipe id as shown by `saved list`
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pantry=info,pantry_kit=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let paths = cli
        .data_dir
        .clone()
        .map(DataPaths::new)
        .unwrap_or_else(DataPaths::platform_default);
    debug!(data_dir = %paths.root().display(), "Using data directory");

    match cli.command {
        Commands::Suggest {
            ref ingredients,
            page,
            page_size,
            save,
        } => {
            let set = IngredientSet::parse(&ingredients.join(","));
            let config = ServiceConfig::from_env()?;
            let cache = open_recipe_cache(&config, &paths).await?;
            suggest(&cache, &paths, &set, page, page_size, save).await?;
        }

        Commands::Detect { ref image, suggest: then_suggest } => {
            let config = ServiceConfig::from_env()?;
            let detected = detect(&config, &paths, image).await?;

            print!("{}", render::detections(&detected));

            if then_suggest && !detected.is_empty() {
                let set: IngredientSet = detected.iter().map(|d| d.name.as_str()).collect();
                println!("\nRecipes for: {}", set);
                let cache = open_recipe_cache(&config, &paths).await?;
                suggest(&cache, &paths, &set, 1, None, None).await?;
            }
        }

        Commands::Cache { ref action } => {
            let store = RecipeStore::with_disk(cache_config_from_env()?, paths.cache_dir()).await?;
            let dir = paths.cache_dir().display().to_string();

            match action {
                CacheAction::Stats => {
                    print!("{}", render::cache_stats(&store.stats().await, &dir));
                }
                CacheAction::Clear => {
                    let count = store.len().await;
                    store.clear().await?;
                    println!("Cleared {} cached results", count);
                }
                CacheAction::PurgeExpired => {
                    let removed = store.cleanup_expired().await?;
                    println!("Removed {} expired results", removed.len());
                }
            }
        }

        Commands::Saved { ref action } => {
            let book = SavedRecipeBook::open(paths.saved_recipes()).await?;

            match action {
                SavedAction::List => {
                    print!("{}", render::saved_list(&book.list().await));
                }
                SavedAction::Remove { ref id } => {
                    if book.remove(id).await? {
                        println!("Removed recipe {}", id);
                    } else {
                        bail!("No saved recipe with id {}", id);
                    }
                }
            }
        }

        Commands::Usage { premium, free } => {
            let tracker = UsageTracker::open(paths.usage(), DEFAULT_FREE_MONTHLY_SCANS).await?;
            if premium || free {
                tracker.set_premium(premium).await?;
            }

            let used = tracker.used().await;
            match tracker.remaining().await {
                Some(remaining) => println!(
                    "Free tier: {} of {} scans used this month, {} left",
                    used,
                    tracker.monthly_limit(),
                    remaining
                ),
                None => println!("Premium: {} scans this month, no limit", used),
            }
        }
    }

    Ok(())
}

async fn open_recipe_cache(config: &ServiceConfig, paths: &DataPaths) -> Result<RecipeCache> {
    let generator = Arc::new(HttpRecipeGenerator::from_config(config)?);
    let cache = RecipeCache::with_disk(config.cache.clone(), paths.cache_dir(), generator)
        .await
        .with_context(|| format!("opening cache at {}", paths.cache_dir().display()))?;
    Ok(cache)
}

async fn suggest(
    cache: &RecipeCache,
    paths: &DataPaths,
    set: &IngredientSet,
    page: usize,
    page_size: Option<usize>,
    save: Option<usize>,
) -> Result<()> {
    let suggestions = cache.suggest(set, page, page_size).await;
    if let Some(error) = suggestions.error {
        bail!(error);
    }

    print!("{}", render::recipe_page(&suggestions.page));

    if let Some(n) = save {
        let Some(recipe) = n.checked_sub(1).and_then(|i| suggestions.page.items.get(i)) else {
            bail!(
                "--save {} is out of range; this page has {} recipes",
                n,
                suggestions.page.items.len()
            );
        };

        let book = SavedRecipeBook::open(paths.saved_recipes()).await?;
        if book.save(recipe.clone()).await? {
            println!("Saved \"{}\"", recipe.title);
        } else {
            println!("\"{}\" is already saved", recipe.title);
        }
    }

    Ok(())
}

/// Detect ingredients in `image`, counting the scan against the monthly quota
///
/// The request id is derived from the image bytes, so scanning the same photo
/// twice in a month counts once.
async fn detect(
    config: &ServiceConfig,
    paths: &DataPaths,
    image: &Path,
) -> Result<Vec<DetectedIngredient>> {
    let tracker = UsageTracker::open(paths.usage(), DEFAULT_FREE_MONTHLY_SCANS).await?;

    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("reading {}", image.display()))?;
    let request_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, &bytes).to_string();

    // Checked before the API call so a refused scan costs nothing upstream
    if !tracker.allows(&request_id).await {
        bail!(
            "You've used all {} free scans for this month.",
            tracker.monthly_limit()
        );
    }

    let vision = HttpVisionClient::from_config(config)?;
    let detected = vision
        .detect(&bytes, pantry_kit::client::mime_for_path(image))
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    tracker.record(&request_id).await?;
    Ok(detected)
}
