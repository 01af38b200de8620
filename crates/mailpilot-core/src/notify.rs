//! Push-notification decoding.
//!
//! Gmail publishes change notifications through Pub/Sub. The push
//! delivery wraps a base64-encoded JSON payload inside an outer JSON
//! envelope:
//!
//! ```text
//! {
//!   "message": {
//!     "data": "<base64 of {\"emailAddress\": ..., \"historyId\": ...}>",
//!     "messageId": "..."
//!   },
//!   "subscription": "projects/.../subscriptions/..."
//! }
//! ```
//!
//! Decoding is pure: no I/O, no clock, no side effects. Every malformed
//! shape collapses into [`CoreError::MalformedNotification`].

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde::Deserialize;

use crate::error::{CoreError, Result};

/// A decoded push notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotification {
    /// The mailbox the change belongs to.
    pub identity: String,

    /// The mailbox's cursor at notification time. Opaque; only ever
    /// handed back to the provider or stored.
    pub cursor_hint: String,

    /// Pub/Sub delivery id, for log correlation across redeliveries.
    pub delivery_id: String,
}

#[derive(Deserialize)]
struct PushEnvelope {
    message: Option<PushMessage>,
}

#[derive(Deserialize)]
struct PushMessage {
    data: Option<String>,
    #[serde(rename = "messageId", default)]
    message_id: Option<String>,
}

#[derive(Deserialize)]
struct PushPayload {
    #[serde(rename = "emailAddress")]
    email_address: String,
    #[serde(rename = "historyId")]
    history_id: HistoryId,
}

/// Gmail serializes the historyId as a decimal string in most responses
/// but as a bare number in push payloads. Accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryId {
    Number(u64),
    Text(String),
}

impl HistoryId {
    fn into_string(self) -> String {
        match self {
            HistoryId::Number(n) => n.to_string(),
            HistoryId::Text(s) => s,
        }
    }
}

/// Decode a push-delivery body into a typed notification.
pub fn decode_push(envelope: &[u8]) -> Result<PushNotification> {
    let envelope: PushEnvelope = serde_json::from_slice(envelope)
        .map_err(|e| CoreError::MalformedNotification(format!("invalid envelope: {e}")))?;

    let message = envelope
        .message
        .ok_or_else(|| CoreError::MalformedNotification("missing message".into()))?;
    let data = message
        .data
        .ok_or_else(|| CoreError::MalformedNotification("missing message.data".into()))?;

    // Pub/Sub encodes with standard base64; some emitters use the
    // url-safe alphabet. Try both before giving up.
    let raw = STANDARD
        .decode(&data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(&data))
        .map_err(|e| CoreError::MalformedNotification(format!("data is not base64: {e}")))?;

    let text = std::str::from_utf8(&raw)
        .map_err(|_| CoreError::MalformedNotification("payload is not utf-8".into()))?;

    let payload: PushPayload = serde_json::from_str(text)
        .map_err(|e| CoreError::MalformedNotification(format!("invalid payload: {e}")))?;

    Ok(PushNotification {
        identity: payload.email_address,
        cursor_hint: payload.history_id.into_string(),
        delivery_id: message.message_id.unwrap_or_default(),
    })
}
