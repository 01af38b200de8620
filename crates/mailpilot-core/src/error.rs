//! Error types for the sync core.

use thiserror::Error;

/// Errors produced by the sync pipeline.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// A push envelope could not be decoded. Dropped and logged; the
    /// provider will not redeliver a fixed envelope.
    #[error("malformed notification: {0}")]
    MalformedNotification(String),

    /// Registering a watch with the provider failed. Surfaced to the
    /// requesting user; retried only by repeating the request.
    #[error("watch registration failed: {message}")]
    WatchRegistrationFailed {
        /// Provider error detail.
        message: String,
    },

    /// A credential was missing, malformed, expired, or forged.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// No identity row exists for the given key.
    #[error("unknown identity: {0}")]
    UnknownIdentity(String),

    /// A provider call failed for reasons other than cursor staleness.
    #[error("provider error: {0}")]
    Provider(#[from] mailpilot_gmail::GmailError),
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_notification_display() {
        let err = CoreError::MalformedNotification("missing message.data".into());
        assert_eq!(
            err.to_string(),
            "malformed notification: missing message.data"
        );
    }

    #[test]
    fn provider_error_converts() {
        let err: CoreError = mailpilot_gmail::GmailError::StaleCursor.into();
        assert!(matches!(err, CoreError::Provider(_)));
    }

    #[test]
    fn watch_registration_failure_carries_detail() {
        let err = CoreError::WatchRegistrationFailed {
            message: "topic not found".into(),
        };
        assert!(err.to_string().contains("topic not found"));
    }
}
