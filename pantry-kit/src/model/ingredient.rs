//! Ingredient types and canonicalization

use crate::cache::types::CacheKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalize a single ingredient name: trimmed, lowercase, single spaces
pub fn canonicalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn words(name: &str) -> Vec<&str> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Equal up to an English plural suffix
fn same_word(a: &str, b: &str) -> bool {
    let plural_of = |long: &str, short: &str| {
        long.strip_prefix(short)
            .is_some_and(|rest| rest == "s" || rest == "es")
    };
    a == b || plural_of(a, b) || plural_of(b, a)
}

/// `needle` appears in `hay` as consecutive whole words
fn contains_run(hay: &[&str], needle: &[&str]) -> bool {
    !needle.is_empty()
        && hay
            .windows(needle.len())
            .any(|window| window.iter().zip(needle).all(|(a, b)| same_word(a, b)))
}

/// Canonical, order-independent set of ingredient names
///
/// Construction trims, lowercases and collapses whitespace in every item,
/// drops empty items, then sorts and dedupes. Two inputs that differ only in
/// order, case or spacing produce equal sets and therefore equal cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct IngredientSet {
    items: Vec<String>,
}

impl IngredientSet {
    /// Build a canonical set from raw names
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut items: Vec<String> = names
            .into_iter()
            .map(|n| canonicalize_name(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        items.sort();
        items.dedup();
        Self { items }
    }

    /// Parse a comma separated list, e.g. `"Tomato, egg ,basil"`
    pub fn parse(input: &str) -> Self {
        Self::new(input.split(','))
    }

    /// Canonical items in sorted order
    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a (raw or canonical) ingredient name is covered by this set
    ///
    /// Names are compared word by word. A name is covered when its words
    /// contain one of the set's items as a run of whole words, or the other
    /// way round. A trailing "s" or "es" is ignored, so "cherry tomatoes" is
    /// covered by "tomato" while "eggplant" is not covered by "egg".
    pub fn covers(&self, name: &str) -> bool {
        let name = canonicalize_name(name);
        let name_words = words(&name);
        if name_words.is_empty() {
            return false;
        }
        self.items.iter().any(|item| {
            let item_words = words(item);
            contains_run(&name_words, &item_words) || contains_run(&item_words, &name_words)
        })
    }

    /// Cache key derived from the canonical items
    pub fn cache_key(&self) -> CacheKey {
        format!("recipes:{}", self.items.join(","))
    }
}

impl fmt::Display for IngredientSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.items.join(", "))
    }
}

impl From<Vec<String>> for IngredientSet {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl From<IngredientSet> for Vec<String> {
    fn from(set: IngredientSet) -> Self {
        set.items
    }
}

impl<S: AsRef<str>> FromIterator<S> for IngredientSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Broad food category reported by the vision API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngredientCategory {
    Vegetable,
    Fruit,
    Protein,
    Dairy,
    Grain,
    Spice,
    Condiment,
    Beverage,
    #[serde(other)]
    Other,
}

impl Default for IngredientCategory {
    fn default() -> Self {
        IngredientCategory::Other
    }
}

impl IngredientCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngredientCategory::Vegetable => "vegetable",
            IngredientCategory::Fruit => "fruit",
            IngredientCategory::Protein => "protein",
            IngredientCategory::Dairy => "dairy",
            IngredientCategory::Grain => "grain",
            IngredientCategory::Spice => "spice",
            IngredientCategory::Condiment => "condiment",
            IngredientCategory::Beverage => "beverage",
            IngredientCategory::Other => "other",
        }
    }
}

impl fmt::Display for IngredientCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ingredient identified in a photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedIngredient {
    pub name: String,
    /// Model confidence in 0.0..=1.0
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub category: IngredientCategory,
}

impl DetectedIngredient {
    pub fn new(name: impl Into<String>, confidence: f64, category: IngredientCategory) -> Self {
        Self {
            name: name.into(),
            confidence: confidence.clamp(0.0, 1.0),
            category,
        }
    }
}
