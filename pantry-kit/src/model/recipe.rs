//! Recipe types produced by the generation API

use crate::error::PantryError;
use crate::model::ingredient::IngredientSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of a recipe's ingredient list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,
    /// Free-form amount, e.g. "2 cups"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
}

impl RecipeIngredient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: None,
        }
    }

    pub fn with_quantity(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: Some(quantity.into()),
        }
    }
}

/// Nutrition per serving
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionFacts {
    #[serde(default)]
    pub calories: u32,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default)]
    pub fiber_g: f64,
}

/// A generated recipe
///
/// Recipes are not mutated after creation. [`Recipe::with_highlights`]
/// returns a new copy annotated for a particular ingredient set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<String>,
    #[serde(default)]
    pub nutrition: NutritionFacts,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub prep_time_minutes: u32,
    #[serde(default)]
    pub cook_time_minutes: u32,
    #[serde(default)]
    pub servings: u32,
    #[serde(default)]
    pub difficulty: Option<String>,
    /// Share of the ingredients the user already has, 0-100
    #[serde(default)]
    pub match_percentage: f64,
    #[serde(default)]
    pub used_ingredients: Vec<String>,
    #[serde(default)]
    pub missing_ingredients: Vec<String>,
}

impl Recipe {
    pub fn new(
        title: impl Into<String>,
        ingredients: Vec<RecipeIngredient>,
        instructions: Vec<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: String::new(),
            ingredients,
            instructions,
            nutrition: NutritionFacts::default(),
            allergens: Vec::new(),
            prep_time_minutes: 0,
            cook_time_minutes: 0,
            servings: 0,
            difficulty: None,
            match_percentage: 0.0,
            used_ingredients: Vec::new(),
            missing_ingredients: Vec::new(),
        }
    }

    /// Percentage of this recipe's ingredients covered by `available`
    pub fn match_percentage_for(&self, available: &IngredientSet) -> f64 {
        if self.ingredients.is_empty() {
            return 0.0;
        }
        let present = self
            .ingredients
            .iter()
            .filter(|i| available.covers(&i.name))
            .count();
        (present as f64 / self.ingredients.len() as f64) * 100.0
    }

    /// Copy of the recipe with used/missing ingredients and match percentage
    /// computed against `available`
    pub fn with_highlights(&self, available: &IngredientSet) -> Recipe {
        let (used, missing): (Vec<&RecipeIngredient>, Vec<&RecipeIngredient>) = self
            .ingredients
            .iter()
            .partition(|i| available.covers(&i.name));

        Recipe {
            match_percentage: self.match_percentage_for(available),
            used_ingredients: used.into_iter().map(|i| i.name.clone()).collect(),
            missing_ingredients: missing.into_iter().map(|i| i.name.clone()).collect(),
            ..self.clone()
        }
    }

    pub fn total_time_minutes(&self) -> u32 {
        self.prep_time_minutes.saturating_add(self.cook_time_minutes)
    }
}

/// Outcome of one recipe generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeResult {
    pub recipes: Vec<Recipe>,
    pub total_count: usize,
    /// Upstream latency in milliseconds
    pub generation_time_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl RecipeResult {
    /// Successful result
    pub fn success(recipes: Vec<Recipe>, generation_time_ms: u64) -> Self {
        Self {
            total_count: recipes.len(),
            recipes,
            generation_time_ms,
            success: true,
            error: None,
            generated_at: Utc::now(),
        }
    }

    /// Failed result carrying a user-facing message
    pub fn failure(err: &PantryError) -> Self {
        Self {
            recipes: Vec::new(),
            total_count: 0,
            generation_time_ms: 0,
            success: false,
            error: Some(err.user_message()),
            generated_at: Utc::now(),
        }
    }

    /// Recipes sorted by match percentage, best first
    pub fn ranked(&self) -> Vec<&Recipe> {
        let mut recipes: Vec<&Recipe> = self.recipes.iter().collect();
        recipes.sort_by(|a, b| b.match_percentage.total_cmp(&a.match_percentage));
        recipes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn omelette() -> Recipe {
        Recipe::new(
            "Tomato omelette",
            vec![
                RecipeIngredient::with_quantity("Eggs", "3"),
                RecipeIngredient::new("Cherry tomatoes"),
                RecipeIngredient::new("Butter"),
                RecipeIngredient::new("Chives"),
            ],
            vec!["Whisk eggs".to_string(), "Cook".to_string()],
        )
    }

    #[test]
    fn test_match_percentage() {
        let recipe = omelette();
        let available = IngredientSet::new(["egg", "tomato"]);
        assert_eq!(recipe.match_percentage_for(&available), 50.0);

        let none = IngredientSet::new(["rice"]);
        assert_eq!(recipe.match_percentage_for(&none), 0.0);
    }

    #[test]
    fn test_match_percentage_without_ingredients() {
        let recipe = Recipe::new("Water", Vec::new(), Vec::new());
        assert_eq!(recipe.match_percentage_for(&IngredientSet::new(["water"])), 0.0);
    }

    #[test]
    fn test_highlights_return_new_copy() {
        let recipe = omelette();
        let available = IngredientSet::new(["egg", "tomato", "butter"]);
        let highlighted = recipe.with_highlights(&available);

        assert_eq!(highlighted.used_ingredients, vec!["Eggs", "Cherry tomatoes", "Butter"]);
        assert_eq!(highlighted.missing_ingredients, vec!["Chives"]);
        assert_eq!(highlighted.match_percentage, 75.0);
        assert_eq!(highlighted.id, recipe.id);

        // source recipe is left as it was
        assert!(recipe.used_ingredients.is_empty());
        assert_eq!(recipe.match_percentage, 0.0);
    }

    #[test]
    fn test_total_time_saturates() {
        let mut recipe = omelette();
        recipe.prep_time_minutes = 10;
        recipe.cook_time_minutes = 15;
        assert_eq!(recipe.total_time_minutes(), 25);

        recipe.prep_time_minutes = u32::MAX;
        recipe.cook_time_minutes = 5;
        assert_eq!(recipe.total_time_minutes(), u32::MAX);
    }

    #[test]
    fn test_failure_result() {
        let err = PantryError::Network("reset".to_string());
        let result = RecipeResult::failure(&err);
        assert!(!result.success);
        assert_eq!(result.total_count, 0);
        assert_eq!(result.error, Some(err.user_message()));
    }

    #[test]
    fn test_ranked_orders_by_match() {
        let mut a = omelette();
        a.match_percentage = 20.0;
        let mut b = omelette();
        b.match_percentage = 90.0;
        let result = RecipeResult::success(vec![a, b], 10);
        let ranked = result.ranked();
        assert_eq!(ranked[0].match_percentage, 90.0);
        assert_eq!(result.total_count, 2);
    }
}
