//! Error types for the assistant provider.

use thiserror::Error;

/// Errors from talking to the chat-completion endpoint.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProviderError {
    /// The provider is not usable (e.g. the API key env var is unset).
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// The provider rejected the credentials (HTTP 401/403).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The provider returned a non-success status.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// A response or stream line could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization / deserialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
