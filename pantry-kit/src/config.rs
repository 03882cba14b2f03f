//! Service configuration loaded from the environment
//!
//! Values come from `PANTRY_*` variables, with a `.env` file in the working
//! directory loaded first when present.

use crate::cache::CacheConfig;
use crate::client::RetryPolicy;
use crate::error::{PantryError, Result};
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_RECIPE_MODEL: &str = "gpt-4o-mini";
const DEFAULT_VISION_MODEL: &str = "gpt-4o";

/// One OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    /// Base URL up to and including the version segment, no trailing slash
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl ApiEndpoint {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Full URL of the chat completions route
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Everything needed to build the remote clients and the recipe cache
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub recipe: ApiEndpoint,
    pub vision: ApiEndpoint,
    /// Per-request timeout for remote calls
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Recipes requested per generation call
    pub recipes_per_request: usize,
    /// Detections below this confidence are dropped
    pub min_confidence: f64,
    pub cache: CacheConfig,
}

impl ServiceConfig {
    /// Load from the process environment (after reading `.env`)
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let fallback_key = get("OPENAI_API_KEY");

        let recipe_key = get("PANTRY_RECIPE_API_KEY")
            .or_else(|| fallback_key.clone())
            .ok_or_else(|| {
                PantryError::Config(
                    "PANTRY_RECIPE_API_KEY (or OPENAI_API_KEY) is not set".to_string(),
                )
            })?;
        let vision_key = get("PANTRY_VISION_API_KEY")
            .or_else(|| fallback_key.clone())
            .unwrap_or_else(|| recipe_key.clone());

        let recipe = ApiEndpoint::new(
            get("PANTRY_RECIPE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            recipe_key,
            get("PANTRY_RECIPE_MODEL").unwrap_or_else(|| DEFAULT_RECIPE_MODEL.to_string()),
        );
        let vision = ApiEndpoint::new(
            get("PANTRY_VISION_API_URL").unwrap_or_else(|| recipe.base_url.clone()),
            vision_key,
            get("PANTRY_VISION_MODEL").unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
        );

        let request_timeout =
            Duration::from_secs(parse_var(&get, "PANTRY_REQUEST_TIMEOUT_SECS")?.unwrap_or(30));

        let mut retry = RetryPolicy::default();
        if let Some(max) = parse_var(&get, "PANTRY_MAX_RETRIES")? {
            retry.max_retries = max;
        }

        let cache = cache_from_lookup(&get)?;

        let min_confidence: f64 = parse_var(&get, "PANTRY_MIN_CONFIDENCE")?.unwrap_or(0.5);
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(PantryError::Config(
                "PANTRY_MIN_CONFIDENCE must be between 0.0 and 1.0".to_string(),
            ));
        }

        let recipes_per_request: usize = parse_var(&get, "PANTRY_RECIPES_PER_REQUEST")?.unwrap_or(6);
        if recipes_per_request == 0 {
            return Err(PantryError::Config(
                "PANTRY_RECIPES_PER_REQUEST must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            recipe,
            vision,
            request_timeout,
            retry,
            recipes_per_request,
            min_confidence,
            cache,
        })
    }
}

/// Cache settings from `PANTRY_CACHE_*` variables
///
/// Needs no API key, so local cache maintenance works without one.
pub fn cache_config_from_env() -> Result<CacheConfig> {
    let _ = dotenv::dotenv();
    cache_from_lookup(&|key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
}

fn cache_from_lookup<G>(get: &G) -> Result<CacheConfig>
where
    G: Fn(&str) -> Option<String>,
{
    let mut cache = CacheConfig::default();
    if let Some(secs) = parse_var::<u64, _>(get, "PANTRY_CACHE_TTL_SECS")? {
        cache.default_ttl = Duration::from_secs(secs);
    }
    if let Some(max) = parse_var(get, "PANTRY_CACHE_MAX_ENTRIES")? {
        cache.max_entries = max;
    }
    cache.validate()?;
    Ok(cache)
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| PantryError::Config(format!("{} has an invalid value: {}", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_fallback_key() {
        let config = ServiceConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();

        assert_eq!(config.recipe.api_key, "sk-test");
        assert_eq!(config.vision.api_key, "sk-test");
        assert_eq!(
            config.recipe.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.cache.default_ttl, Duration::from_secs(86_400));
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_explicit_values() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("PANTRY_RECIPE_API_KEY", "recipe-key"),
            ("PANTRY_VISION_API_KEY", "vision-key"),
            ("PANTRY_RECIPE_API_URL", "http://localhost:8080/v1/"),
            ("PANTRY_CACHE_TTL_SECS", "60"),
            ("PANTRY_CACHE_MAX_ENTRIES", "5"),
            ("PANTRY_MAX_RETRIES", "1"),
        ]))
        .unwrap();

        assert_eq!(config.recipe.base_url, "http://localhost:8080/v1");
        assert_eq!(config.vision.base_url, "http://localhost:8080/v1");
        assert_eq!(config.vision.api_key, "vision-key");
        assert_eq!(config.cache.max_entries, 5);
        assert_eq!(config.cache.default_ttl, Duration::from_secs(60));
        assert_eq!(config.retry.max_retries, 1);
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = ServiceConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, PantryError::Config(_)));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let err = ServiceConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "k"),
            ("PANTRY_REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PANTRY_REQUEST_TIMEOUT_SECS"));

        let err = ServiceConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "k"),
            ("PANTRY_CACHE_MAX_ENTRIES", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, PantryError::Config(_)));
    }
}
