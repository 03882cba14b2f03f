//! Remote API clients
//!
//! Both the vision and the recipe APIs are reached through an OpenAI-style
//! chat completion endpoint. Transient failures (timeouts, network errors,
//! rate limits, 5xx) are retried with backoff; authentication and
//! validation failures are returned immediately.

pub mod chat;
pub mod prompt;
pub mod recipe;
pub mod retry;
pub mod vision;

pub use chat::ChatClient;
pub use recipe::{HttpRecipeGenerator, RecipeGenerator};
pub use retry::{retry, Backoff, RetryPolicy};
pub use vision::{mime_for_path, refine_detections, HttpVisionClient, IngredientDetector};
