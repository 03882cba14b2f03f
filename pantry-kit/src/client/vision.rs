//! Ingredient detection from photos through a vision-capable chat API

use crate::client::chat::ChatClient;
use crate::client::prompt;
use crate::client::retry::{retry, RetryPolicy};
use crate::config::ServiceConfig;
use crate::error::{PantryError, Result};
use crate::model::{canonicalize_name, DetectedIngredient};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Largest image accepted before encoding
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Anything that can list the ingredients in an image
#[async_trait]
pub trait IngredientDetector: Send + Sync {
    async fn detect(&self, image: &[u8], mime_type: &str) -> Result<Vec<DetectedIngredient>>;
}

/// Guess an image MIME type from a file extension
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

/// Drop low-confidence detections, merge duplicates by canonical name
/// (keeping the most confident) and sort by confidence, highest first
pub fn refine_detections(
    detections: Vec<DetectedIngredient>,
    min_confidence: f64,
) -> Vec<DetectedIngredient> {
    let mut best: HashMap<String, DetectedIngredient> = HashMap::new();

    for detection in detections {
        if detection.confidence < min_confidence {
            continue;
        }
        let key = canonicalize_name(&detection.name);
        if key.is_empty() {
            continue;
        }
        match best.get(&key) {
            Some(existing) if existing.confidence >= detection.confidence => {}
            _ => {
                best.insert(key, detection);
            }
        }
    }

    let mut refined: Vec<DetectedIngredient> = best.into_values().collect();
    refined.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.name.cmp(&b.name))
    });
    refined
}

/// [`IngredientDetector`] backed by an OpenAI-compatible vision endpoint
#[derive(Debug, Clone)]
pub struct HttpVisionClient {
    chat: ChatClient,
    retry: RetryPolicy,
    min_confidence: f64,
}

impl HttpVisionClient {
    pub fn new(chat: ChatClient, retry: RetryPolicy, min_confidence: f64) -> Self {
        Self {
            chat,
            retry,
            min_confidence: min_confidence.clamp(0.0, 1.0),
        }
    }

    /// Build from service configuration
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let chat = ChatClient::new(config.vision.clone(), config.request_timeout)?;
        Ok(Self::new(chat, config.retry.clone(), config.min_confidence))
    }

    /// Read an image file and detect its ingredients
    pub async fn detect_file(&self, path: &Path) -> Result<Vec<DetectedIngredient>> {
        let bytes = tokio::fs::read(path).await?;
        self.detect(&bytes, mime_for_path(path)).await
    }
}

#[async_trait]
impl IngredientDetector for HttpVisionClient {
    async fn detect(&self, image: &[u8], mime_type: &str) -> Result<Vec<DetectedIngredient>> {
        if image.is_empty() {
            return Err(PantryError::Validation("The image is empty.".to_string()));
        }
        if image.len() > MAX_IMAGE_BYTES {
            return Err(PantryError::Validation(format!(
                "The image is too large ({} MB max).",
                MAX_IMAGE_BYTES / (1024 * 1024)
            )));
        }

        let data_url = format!("data:{};base64,{}", mime_type, STANDARD.encode(image));
        let messages = prompt::vision_messages(&data_url);

        let chat = &self.chat;
        let messages = &messages;
        let detections = retry(&self.retry, "ingredient detection", move || async move {
            let content = chat.complete(messages.clone(), 0.0).await?;
            prompt::parse_detections(&content)
        })
        .await?;

        let refined = refine_detections(detections, self.min_confidence);
        info!(
            detected = refined.len(),
            image_bytes = image.len(),
            "Detected ingredients"
        );
        Ok(refined)
    }
}
