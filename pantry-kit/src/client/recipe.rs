//! Recipe generation through a chat completion API

use crate::client::chat::ChatClient;
use crate::client::prompt;
use crate::client::retry::{retry, RetryPolicy};
use crate::config::ServiceConfig;
use crate::error::{PantryError, Result};
use crate::model::{IngredientSet, RecipeResult};
use async_trait::async_trait;
use std::time::Instant;
use tracing::info;

/// Sampling temperature for recipe generation
const RECIPE_TEMPERATURE: f64 = 0.7;

/// Anything that can turn an ingredient set into recipes
#[async_trait]
pub trait RecipeGenerator: Send + Sync {
    async fn generate(&self, ingredients: &IngredientSet) -> Result<RecipeResult>;
}

/// [`RecipeGenerator`] backed by an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct HttpRecipeGenerator {
    chat: ChatClient,
    retry: RetryPolicy,
    recipes_per_request: usize,
}

impl HttpRecipeGenerator {
    pub fn new(chat: ChatClient, retry: RetryPolicy, recipes_per_request: usize) -> Self {
        Self {
            chat,
            retry,
            recipes_per_request: recipes_per_request.max(1),
        }
    }

    /// Build from service configuration
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let chat = ChatClient::new(config.recipe.clone(), config.request_timeout)?;
        Ok(Self::new(
            chat,
            config.retry.clone(),
            config.recipes_per_request,
        ))
    }
}

#[async_trait]
impl RecipeGenerator for HttpRecipeGenerator {
    async fn generate(&self, ingredients: &IngredientSet) -> Result<RecipeResult> {
        if ingredients.is_empty() {
            return Err(PantryError::Validation(
                "Add at least one ingredient to get recipe ideas.".to_string(),
            ));
        }

        let started = Instant::now();
        let messages = prompt::recipe_messages(ingredients, self.recipes_per_request);

        let chat = &self.chat;
        let messages = &messages;
        let recipes = retry(&self.retry, "recipe generation", move || async move {
            let content = chat.complete(messages.clone(), RECIPE_TEMPERATURE).await?;
            prompt::parse_recipes(&content)
        })
        .await?;

        let recipes = recipes
            .iter()
            .map(|r| r.with_highlights(ingredients))
            .collect::<Vec<_>>();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            ingredients = %ingredients,
            recipes = recipes.len(),
            elapsed_ms,
            model = %self.chat.endpoint().model,
            "Generated recipes"
        );

        Ok(RecipeResult::success(recipes, elapsed_ms))
    }
}
