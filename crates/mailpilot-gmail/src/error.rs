//! Error types for the Gmail provider.

use thiserror::Error;

/// Errors from talking to the Gmail API.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GmailError {
    /// The start cursor handed to `history.list` is too old for Gmail to
    /// resolve a delta from. The caller must fall back to a full resync.
    #[error("history cursor too old to resolve")]
    StaleCursor,

    /// Refreshing the access token from the refresh token failed.
    #[error("token refresh failed: {0}")]
    TokenRefresh(String),

    /// The API returned a non-success status.
    #[error("gmail api error: status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, best effort.
        message: String,
    },

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for provider operations.
pub type Result<T> = std::result::Result<T, GmailError>;
