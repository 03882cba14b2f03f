//! Domain model
//!
//! Ingredients as the user or the vision API reports them, and the recipes
//! generated from them.

pub mod ingredient;
pub mod recipe;

pub use ingredient::{canonicalize_name, DetectedIngredient, IngredientCategory, IngredientSet};
pub use recipe::{NutritionFacts, Recipe, RecipeIngredient, RecipeResult};
