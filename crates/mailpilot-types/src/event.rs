//! Events pushed to live client connections.
//!
//! A [`StreamEvent`] is one named frame on a real-time channel. The hub
//! and the SSE layer treat it as opaque: a name plus a JSON payload.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// One named event frame for a real-time stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Event name, e.g. `email:new`.
    pub name: String,

    /// JSON payload delivered under the event name.
    pub data: serde_json::Value,
}

impl StreamEvent {
    /// Build an event from a name and payload.
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Initial frame confirming which identity a connection resolved to.
    pub fn connected(identity: &str) -> Self {
        Self::new("connected", json!({ "identity": identity }))
    }

    /// A new message landed in the inbox.
    pub fn email_new(message_id: &str) -> Self {
        Self::new("email:new", json!({ "messageId": message_id }))
    }

    /// The stored cursor went stale; the client should re-fetch state.
    pub fn sync_stale(identity: &str) -> Self {
        Self::new("sync:stale", json!({ "identity": identity, "resync": true }))
    }

    /// One streamed token of an assistant reply.
    pub fn chat_token(text: &str) -> Self {
        Self::new("chat:token", json!({ "text": text }))
    }

    /// The assistant reply finished streaming.
    pub fn chat_done() -> Self {
        Self::new("chat:done", json!({}))
    }
}
