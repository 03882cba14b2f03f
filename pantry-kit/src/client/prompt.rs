//! Prompt text and tolerant parsing of model output
//!
//! Models do not always follow the requested shape exactly: the JSON may be
//! wrapped in a markdown fence, keys vary (`name` vs `title`, `steps` vs
//! `instructions`) and numbers sometimes arrive as strings such as
//! `"15 minutes"`. The parsers here accept those variants.

use crate::error::{PantryError, Result};
use crate::model::{
    DetectedIngredient, IngredientSet, NutritionFacts, Recipe, RecipeIngredient,
};
use serde::Deserialize;
use serde_json::{json, Value};

pub const RECIPE_SYSTEM_PROMPT: &str = "You are a helpful chef. Suggest practical home recipes \
that use the ingredients the user has. Reply with JSON only.";

pub const VISION_SYSTEM_PROMPT: &str = "You identify food ingredients in photos. Reply with JSON \
only.";

/// User message asking for `count` recipes built around `ingredients`
pub fn recipe_user_prompt(ingredients: &IngredientSet, count: usize) -> String {
    format!(
        "I have these ingredients: {}.\n\
         Suggest {} recipes that use as many of them as possible. Basic pantry staples \
         (salt, pepper, oil, water) may be assumed.\n\
         Respond with a JSON object {{\"recipes\": [...]}} where each recipe has: \
         \"title\", \"description\", \"ingredients\" (array of {{\"name\", \"quantity\"}}), \
         \"instructions\" (array of strings), \"nutrition\" ({{\"calories\", \"protein_g\", \
         \"carbs_g\", \"fat_g\", \"fiber_g\"}} per serving), \"allergens\" (array of strings), \
         \"prep_time_minutes\", \"cook_time_minutes\", \"servings\" and \"difficulty\" \
         (easy, medium or hard).",
        ingredients, count
    )
}

/// Chat messages for a recipe request
pub fn recipe_messages(ingredients: &IngredientSet, count: usize) -> Vec<Value> {
    vec![
        json!({ "role": "system", "content": RECIPE_SYSTEM_PROMPT }),
        json!({ "role": "user", "content": recipe_user_prompt(ingredients, count) }),
    ]
}

/// Chat messages for an ingredient detection request on a `data:` URL
pub fn vision_messages(image_data_url: &str) -> Vec<Value> {
    vec![
        json!({ "role": "system", "content": VISION_SYSTEM_PROMPT }),
        json!({
            "role": "user",
            "content": [
                {
                    "type": "text",
                    "text": "List the food ingredients visible in this photo. Respond with a \
                             JSON object {\"ingredients\": [{\"name\", \"confidence\", \
                             \"category\"}]} where confidence is between 0 and 1 and category \
                             is one of vegetable, fruit, protein, dairy, grain, spice, \
                             condiment, beverage, other."
                },
                { "type": "image_url", "image_url": { "url": image_data_url } }
            ]
        }),
    ]
}

/// Strip a surrounding markdown code fence, if any
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop an optional language tag on the opening line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse content that is either `{"<field>": [...]}` or a bare array
fn parse_list<T: for<'de> Deserialize<'de>>(content: &str, field: &str) -> Result<Vec<T>> {
    let value: Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| PantryError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(field) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(PantryError::MalformedResponse(format!(
                    "missing \"{}\" array",
                    field
                )))
            }
        },
        _ => {
            return Err(PantryError::MalformedResponse(
                "expected a JSON object or array".to_string(),
            ))
        }
    };

    // skip individual items that do not fit rather than failing the batch
    Ok(list
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Read a number from a JSON number or a string like "15 minutes"
fn lenient_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

fn lenient_u32(value: &Option<Value>) -> u32 {
    value
        .as_ref()
        .and_then(lenient_number)
        .map(|n| n.max(0.0).min(u32::MAX as f64).round() as u32)
        .unwrap_or(0)
}

fn lenient_f64(value: &Option<Value>) -> f64 {
    value
        .as_ref()
        .and_then(lenient_number)
        .map(|n| n.max(0.0))
        .unwrap_or(0.0)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIngredient {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, alias = "amount")]
        quantity: Option<Value>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RawNutrition {
    #[serde(default)]
    calories: Option<Value>,
    #[serde(default, alias = "protein")]
    protein_g: Option<Value>,
    #[serde(default, alias = "carbs", alias = "carbohydrates")]
    carbs_g: Option<Value>,
    #[serde(default, alias = "fat")]
    fat_g: Option<Value>,
    #[serde(default, alias = "fiber")]
    fiber_g: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawRecipe {
    #[serde(alias = "name")]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    ingredients: Vec<RawIngredient>,
    #[serde(default, alias = "steps")]
    instructions: Vec<String>,
    #[serde(default)]
    nutrition: RawNutrition,
    #[serde(default)]
    allergens: Vec<String>,
    #[serde(default, alias = "prep_time")]
    prep_time_minutes: Option<Value>,
    #[serde(default, alias = "cook_time")]
    cook_time_minutes: Option<Value>,
    #[serde(default)]
    servings: Option<Value>,
    #[serde(default)]
    difficulty: Option<String>,
}

impl RawRecipe {
    fn into_recipe(self) -> Option<Recipe> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return None;
        }

        let ingredients = self
            .ingredients
            .into_iter()
            .map(|raw| match raw {
                RawIngredient::Name(name) => RecipeIngredient::new(name.trim()),
                RawIngredient::Detailed { name, quantity } => RecipeIngredient {
                    name: name.trim().to_string(),
                    quantity: quantity.and_then(|q| match q {
                        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    }),
                },
            })
            .filter(|i| !i.name.is_empty())
            .collect();

        let instructions = self
            .instructions
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut recipe = Recipe::new(title, ingredients, instructions);
        recipe.description = self.description.trim().to_string();
        recipe.nutrition = NutritionFacts {
            calories: lenient_u32(&self.nutrition.calories),
            protein_g: lenient_f64(&self.nutrition.protein_g),
            carbs_g: lenient_f64(&self.nutrition.carbs_g),
            fat_g: lenient_f64(&self.nutrition.fat_g),
            fiber_g: lenient_f64(&self.nutrition.fiber_g),
        };
        recipe.allergens = self
            .allergens
            .into_iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect();
        recipe.prep_time_minutes = lenient_u32(&self.prep_time_minutes);
        recipe.cook_time_minutes = lenient_u32(&self.cook_time_minutes);
        recipe.servings = lenient_u32(&self.servings);
        recipe.difficulty = self
            .difficulty
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty());
        Some(recipe)
    }
}

/// Parse recipes from model output; fails if none are usable
pub fn parse_recipes(content: &str) -> Result<Vec<Recipe>> {
    let raw: Vec<RawRecipe> = parse_list(content, "recipes")?;
    let recipes: Vec<Recipe> = raw.into_iter().filter_map(RawRecipe::into_recipe).collect();

    if recipes.is_empty() {
        return Err(PantryError::MalformedResponse(
            "response contained no usable recipes".to_string(),
        ));
    }
    Ok(recipes)
}

/// Parse detections from model output; an empty list is valid
pub fn parse_detections(content: &str) -> Result<Vec<DetectedIngredient>> {
    let detections: Vec<DetectedIngredient> = parse_list(content, "ingredients")?;
    Ok(detections
        .into_iter()
        .filter(|d| !d.name.trim().is_empty())
        .map(|d| DetectedIngredient::new(d.name.trim(), d.confidence, d.category))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IngredientCategory;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_recipes_tolerates_variants() {
        let content = r#"```json
        {"recipes": [
            {
                "name": "Shakshuka",
                "ingredients": ["Eggs", {"name": "Tomatoes", "amount": "400 g"}, {"name": "Cumin", "quantity": 1}],
                "steps": ["Simmer tomatoes", "Crack eggs in"],
                "nutrition": {"calories": "320 kcal", "protein": 18, "carbs": "12g", "fat": 20.5},
                "allergens": ["Eggs"],
                "prep_time": "10 minutes",
                "cook_time_minutes": 20,
                "servings": 2,
                "difficulty": "Easy"
            },
            {"title": "   "},
            {"unrelated": true}
        ]}
        ```"#;

        let recipes = parse_recipes(content).unwrap();
        assert_eq!(recipes.len(), 1);

        let r = &recipes[0];
        assert_eq!(r.title, "Shakshuka");
        assert_eq!(r.ingredients.len(), 3);
        assert_eq!(r.ingredients[1].quantity.as_deref(), Some("400 g"));
        assert_eq!(r.ingredients[2].quantity.as_deref(), Some("1"));
        assert_eq!(r.instructions.len(), 2);
        assert_eq!(r.nutrition.calories, 320);
        assert_eq!(r.nutrition.carbs_g, 12.0);
        assert_eq!(r.nutrition.fat_g, 20.5);
        assert_eq!(r.allergens, vec!["eggs"]);
        assert_eq!(r.prep_time_minutes, 10);
        assert_eq!(r.total_time_minutes(), 30);
        assert_eq!(r.difficulty.as_deref(), Some("easy"));
        assert!(!r.id.is_empty());
    }

    #[test]
    fn test_parse_recipes_bare_array() {
        let recipes = parse_recipes(r#"[{"title": "Toast", "ingredients": ["bread"]}]"#).unwrap();
        assert_eq!(recipes[0].title, "Toast");
    }

    #[test]
    fn test_parse_recipes_rejects_garbage() {
        assert!(matches!(
            parse_recipes("Sorry, I can't help with that."),
            Err(PantryError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_recipes(r#"{"recipes": []}"#),
            Err(PantryError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_recipes(r#"{"dishes": []}"#),
            Err(PantryError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_detections() {
        let content = r#"{"ingredients": [
            {"name": " Tomato ", "confidence": 0.92, "category": "vegetable"},
            {"name": "Mystery", "confidence": 1.7, "category": "alien"},
            {"name": ""}
        ]}"#;
        let detections = parse_detections(content).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].name, "Tomato");
        assert_eq!(detections[0].category, IngredientCategory::Vegetable);
        assert_eq!(detections[1].confidence, 1.0);
        assert_eq!(detections[1].category, IngredientCategory::Other);

        assert!(parse_detections(r#"{"ingredients": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_recipe_prompt_mentions_ingredients() {
        let set = IngredientSet::new(["Egg", "Rice"]);
        let prompt = recipe_user_prompt(&set, 4);
        assert!(prompt.contains("egg, rice"));
        assert!(prompt.contains("Suggest 4 recipes"));
        assert_eq!(recipe_messages(&set, 4).len(), 2);
    }
}
