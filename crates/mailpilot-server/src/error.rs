//! HTTP error mapping.
//!
//! Handlers return [`ApiError`]; the conversions below decide which
//! failures become which status codes. Reconciliation errors triggered
//! by push notifications never pass through here -- the notification
//! transport has already been acknowledged by then.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use mailpilot_core::CoreError;
use mailpilot_gmail::GmailError;
use mailpilot_llm::ProviderError;

/// An error ready to be rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Build an error with an explicit status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The status this error renders as.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The message body this error renders with.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::MalformedNotification(_) => StatusCode::BAD_REQUEST,
            CoreError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            CoreError::UnknownIdentity(_) => StatusCode::NOT_FOUND,
            CoreError::WatchRegistrationFailed { .. } | CoreError::Provider(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<GmailError> for ApiError {
    fn from(err: GmailError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, err.to_string())
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_maps_to_401() {
        let err: ApiError = CoreError::Unauthenticated("no token".into()).into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn malformed_notification_maps_to_400() {
        let err: ApiError = CoreError::MalformedNotification("bad".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_identity_maps_to_404() {
        let err: ApiError = CoreError::UnknownIdentity("ghost".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn watch_registration_failure_maps_to_502() {
        let err: ApiError = CoreError::WatchRegistrationFailed {
            message: "topic missing".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.message().contains("topic missing"));
    }

    #[test]
    fn gmail_errors_map_to_502() {
        let err: ApiError = GmailError::StaleCursor.into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
