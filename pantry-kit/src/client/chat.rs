//! Minimal OpenAI-compatible chat completion transport shared by the vision
//! and recipe clients

use crate::config::ApiEndpoint;
use crate::error::{PantryError, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Sends chat completion requests to one endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    endpoint: ApiEndpoint,
    timeout: Duration,
}

impl ChatClient {
    pub fn new(endpoint: ApiEndpoint, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PantryError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &ApiEndpoint {
        &self.endpoint
    }

    /// Send `messages` and return the first choice's text content
    ///
    /// Asks for a JSON object response. One attempt; callers wrap this in
    /// [`crate::client::retry`].
    pub async fn complete(&self, messages: Vec<Value>, temperature: f64) -> Result<String> {
        let body = json!({
            "model": self.endpoint.model,
            "messages": messages,
            "temperature": temperature,
            "response_format": { "type": "json_object" },
        });

        let timeout_secs = self.timeout.as_secs();
        let response = self
            .http
            .post(self.endpoint.completions_url())
            .bearer_auth(&self.endpoint.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PantryError::from_reqwest(e, timeout_secs))?;

        let status = response.status();
        debug!(status = status.as_u16(), model = %self.endpoint.model, "Chat completion response");

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();

            return Err(match PantryError::from_status(status.as_u16(), &text) {
                PantryError::RateLimited { .. } => PantryError::RateLimited {
                    retry_after_secs: retry_after,
                },
                other => other,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| PantryError::from_reqwest(e, timeout_secs))?;

        extract_content(parsed)
    }
}

fn extract_content(response: CompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| PantryError::MalformedResponse("completion had no content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"recipes\":[]}"}}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_content(parsed).unwrap(), r#"{"recipes":[]}"#);
    }

    #[test]
    fn test_empty_choices_is_malformed() {
        let parsed: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_content(parsed),
            Err(PantryError::MalformedResponse(_))
        ));

        let parsed: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(extract_content(parsed).is_err());
    }
}
