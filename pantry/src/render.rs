//! Plain-text output for the terminal

use pantry_kit::{CacheStats, DetectedIngredient, Page, Recipe, SavedRecipe};

/// One-line summary: title, match and time
pub fn recipe_line(index: usize, recipe: &Recipe) -> String {
    let mut line = format!(
        "{:>2}. {} ({:.0}% match",
        index, recipe.title, recipe.match_percentage
    );
    let minutes = recipe.total_time_minutes();
    if minutes > 0 {
        line.push_str(&format!(", {} min", minutes));
    }
    line.push(')');
    line
}

/// Full recipe with used/missing ingredients
pub fn recipe_detail(recipe: &Recipe) -> String {
    let mut out = String::new();
    if !recipe.description.is_empty() {
        out.push_str(&format!("    {}\n", recipe.description));
    }

    for ingredient in &recipe.ingredients {
        let have = recipe.used_ingredients.contains(&ingredient.name);
        let marker = if have { "✓" } else { "✗" };
        match &ingredient.quantity {
            Some(quantity) => out.push_str(&format!(
                "    [{}] {} ({})\n",
                marker, ingredient.name, quantity
            )),
            None => out.push_str(&format!("    [{}] {}\n", marker, ingredient.name)),
        }
    }

    if !recipe.missing_ingredients.is_empty() {
        out.push_str(&format!(
            "    Missing: {}\n",
            recipe.missing_ingredients.join(", ")
        ));
    }
    if !recipe.allergens.is_empty() {
        out.push_str(&format!("    Allergens: {}\n", recipe.allergens.join(", ")));
    }
    if recipe.nutrition.calories > 0 {
        out.push_str(&format!(
            "    {} kcal, {:.0} g protein, {:.0} g carbs, {:.0} g fat\n",
            recipe.nutrition.calories,
            recipe.nutrition.protein_g,
            recipe.nutrition.carbs_g,
            recipe.nutrition.fat_g
        ));
    }
    out
}

/// A page of recipes, numbered from the start of the page
pub fn recipe_page(page: &Page<Recipe>) -> String {
    if page.is_empty() {
        return format!(
            "No recipes on page {} ({} total).\n",
            page.page, page.total_items
        );
    }

    let mut out = format!(
        "Page {}/{} ({} recipes)\n",
        page.page, page.total_pages, page.total_items
    );
    for (i, recipe) in page.items.iter().enumerate() {
        out.push_str(&recipe_line(i + 1, recipe));
        out.push('\n');
        out.push_str(&recipe_detail(recipe));
    }
    if page.has_next_page {
        out.push_str(&format!("More: --page {}\n", page.page + 1));
    }
    out
}

pub fn detections(items: &[DetectedIngredient]) -> String {
    if items.is_empty() {
        return "No ingredients detected.\n".to_string();
    }
    items
        .iter()
        .map(|d| {
            format!(
                "  - {} [{}] {:.0}%\n",
                d.name,
                d.category,
                d.confidence * 100.0
            )
        })
        .collect()
}

pub fn saved_list(saved: &[SavedRecipe]) -> String {
    if saved.is_empty() {
        return "No saved recipes.\n".to_string();
    }
    saved
        .iter()
        .map(|s| {
            format!(
                "  {}  {}  (saved {})\n",
                s.recipe.id,
                s.recipe.title,
                s.saved_at.format("%Y-%m-%d %H:%M")
            )
        })
        .collect()
}

pub fn cache_stats(stats: &CacheStats, dir: &str) -> String {
    format!(
        "Cache: {}\n  Entries:    {}\n  Hits:       {}\n  Misses:     {}\n  Evictions:  {} (capacity {}, expired {})\n",
        dir,
        stats.entries,
        stats.hits,
        stats.misses,
        stats.total_evictions(),
        stats.evictions_capacity,
        stats.evictions_ttl
    )
}
