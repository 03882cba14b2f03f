//! Saved recipes

use crate::error::Result;
use crate::model::{canonicalize_name, Recipe};
use crate::storage::{read_json, write_json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A recipe with the time it was saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecipe {
    pub recipe: Recipe,
    pub saved_at: DateTime<Utc>,
}

impl SavedRecipe {
    fn is_same_recipe(&self, recipe: &Recipe) -> bool {
        self.recipe.id == recipe.id
            || canonicalize_name(&self.recipe.title) == canonicalize_name(&recipe.title)
    }
}

/// Saved recipes persisted to one JSON file
///
/// A recipe is a duplicate when its id or its normalized title is already
/// in the book.
#[derive(Debug, Clone)]
pub struct SavedRecipeBook {
    path: PathBuf,
    recipes: Arc<Mutex<Vec<SavedRecipe>>>,
}

impl SavedRecipeBook {
    /// Open the book at `path`, starting empty if the file is missing
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let recipes: Vec<SavedRecipe> = read_json(&path).await?.unwrap_or_default();
        debug!(path = %path.display(), count = recipes.len(), "Opened saved recipes");

        Ok(Self {
            path,
            recipes: Arc::new(Mutex::new(recipes)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save a recipe; returns `false` if it was already saved
    pub async fn save(&self, recipe: Recipe) -> Result<bool> {
        let mut recipes = self.recipes.lock().await;
        if recipes.iter().any(|saved| saved.is_same_recipe(&recipe)) {
            debug!(title = %recipe.title, "Recipe already saved");
            return Ok(false);
        }

        let title = recipe.title.clone();
        recipes.push(SavedRecipe {
            recipe,
            saved_at: Utc::now(),
        });

        if let Err(e) = write_json(&self.path, &*recipes).await {
            recipes.pop();
            return Err(e);
        }
        info!(title = %title, "Saved recipe");
        Ok(true)
    }

    /// Remove by recipe id; returns `false` if nothing matched
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let mut recipes = self.recipes.lock().await;
        let Some(index) = recipes.iter().position(|saved| saved.recipe.id == id) else {
            return Ok(false);
        };

        let removed = recipes.remove(index);
        if let Err(e) = write_json(&self.path, &*recipes).await {
            recipes.insert(index, removed);
            return Err(e);
        }
        Ok(true)
    }

    /// All saved recipes, newest first
    pub async fn list(&self) -> Vec<SavedRecipe> {
        let mut recipes = self.recipes.lock().await.clone();
        recipes.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        recipes
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.recipes
            .lock()
            .await
            .iter()
            .any(|saved| saved.recipe.id == id)
    }

    pub async fn len(&self) -> usize {
        self.recipes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.recipes.lock().await.is_empty()
    }
}
