//! Error types for pantry operations
//!
//! Every failure the library can produce is a [`PantryError`]. Remote API
//! failures are classified by HTTP status or transport error so callers can
//! decide whether to retry and what to show the user.

use thiserror::Error;

/// Main error type for pantry operations
///
/// The type is `Clone` so one upstream failure can be handed to every
/// caller waiting on the same in-flight fetch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PantryError {
    /// Request did not complete in time
    #[error("Operation timed out after {timeout_seconds}s: {context}")]
    Timeout {
        timeout_seconds: u64,
        context: String,
    },

    /// Connection refused, DNS failure, reset, ...
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid or missing API credentials
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Upstream asked us to slow down
    #[error("Rate limited by upstream API")]
    RateLimited {
        /// Seconds to wait, from the `Retry-After` header when present
        retry_after_secs: Option<u64>,
    },

    /// Upstream returned a 5xx status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Any other non-success HTTP status
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// Response arrived but could not be understood
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Input rejected before or by the upstream API
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Local file storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for pantry operations
pub type Result<T> = std::result::Result<T, PantryError>;

impl PantryError {
    /// Classify a non-success HTTP status and its response body
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = truncate_body(body);
        match status {
            401 | 403 => PantryError::Authentication(message),
            429 => PantryError::RateLimited {
                retry_after_secs: None,
            },
            400 | 404 | 422 => PantryError::Validation(message),
            500..=599 => PantryError::Server { status, message },
            _ => PantryError::Http { status, message },
        }
    }

    /// Classify a transport-level reqwest error
    pub fn from_reqwest(err: reqwest::Error, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            PantryError::Timeout {
                timeout_seconds,
                context: err.to_string(),
            }
        } else if err.is_decode() {
            PantryError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            PantryError::from_status(status.as_u16(), &err.to_string())
        } else {
            PantryError::Network(err.to_string())
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PantryError::Timeout { .. }
                | PantryError::Network(_)
                | PantryError::RateLimited { .. }
                | PantryError::Server { .. }
        )
    }

    /// Short message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            PantryError::Timeout { .. } => {
                "The request took too long. Please try again.".to_string()
            }
            PantryError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            PantryError::Authentication(_) => {
                "The service rejected our credentials. Please check the API key.".to_string()
            }
            PantryError::RateLimited { retry_after_secs } => match retry_after_secs {
                Some(secs) => format!("Too many requests. Please wait {}s and try again.", secs),
                None => "Too many requests. Please wait a moment and try again.".to_string(),
            },
            PantryError::Server { .. } | PantryError::Http { .. } => {
                "The service is having trouble right now. Please try again later.".to_string()
            }
            PantryError::MalformedResponse(_) => {
                "We received an unexpected response. Please try again.".to_string()
            }
            PantryError::Validation(msg) => msg.clone(),
            PantryError::Config(_) => "The app is not configured correctly.".to_string(),
            PantryError::Serialization(_) | PantryError::Storage(_) | PantryError::Other(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        let mut s: String = trimmed.chars().take(MAX).collect();
        s.push_str("...");
        s
    }
}

impl From<serde_json::Error> for PantryError {
    fn from(e: serde_json::Error) -> Self {
        PantryError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for PantryError {
    fn from(e: std::io::Error) -> Self {
        PantryError::Storage(e.to_string())
    }
}

impl From<String> for PantryError {
    fn from(s: String) -> Self {
        PantryError::Other(s)
    }
}

impl From<&str> for PantryError {
    fn from(s: &str) -> Self {
        PantryError::Other(s.to_string())
    }
}
