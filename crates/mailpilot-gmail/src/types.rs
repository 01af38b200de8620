//! Wire types for the Gmail REST API.
//!
//! Field names follow Gmail's camelCase JSON. Only the fields the rest of
//! the system reads are modeled; unknown fields are ignored on decode.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The label Gmail puts on inbox messages.
pub const INBOX_LABEL: &str = "INBOX";

/// The label Gmail puts on unread messages.
pub const UNREAD_LABEL: &str = "UNREAD";

/// Response from `users.watch`.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchResponse {
    /// Cursor at the moment the watch was registered.
    #[serde(rename = "historyId")]
    pub history_id: String,

    /// Expiration as epoch milliseconds, serialized by Gmail as a string.
    pub expiration: String,
}

impl WatchResponse {
    /// Parse the expiration into an absolute timestamp.
    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        let millis: i64 = self.expiration.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}

/// Response from `users.history.list`, possibly one page of several.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResponse {
    /// Change records since the start cursor, in provider order.
    pub history: Option<Vec<HistoryRecord>>,

    /// The mailbox's current cursor.
    #[serde(rename = "historyId")]
    pub history_id: Option<String>,

    /// Continuation token when the delta spans pages.
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

impl HistoryResponse {
    /// All records across this response, empty when none.
    pub fn records(&self) -> &[HistoryRecord] {
        self.history.as_deref().unwrap_or_default()
    }
}

/// One history record. A record may carry several kinds of change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryRecord {
    /// Record id (itself a history id).
    pub id: String,

    /// Messages that entered the mailbox.
    #[serde(rename = "messagesAdded")]
    pub messages_added: Option<Vec<HistoryMessageChange>>,

    /// Messages that were removed entirely.
    #[serde(rename = "messagesDeleted")]
    pub messages_deleted: Option<Vec<HistoryMessageChange>>,
}

impl HistoryRecord {
    /// Message refs added by this record, empty when none.
    pub fn added(&self) -> impl Iterator<Item = &MessageRef> {
        self.messages_added
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|c| &c.message)
    }
}

/// Wrapper Gmail puts around a message ref inside a history record.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessageChange {
    /// The affected message.
    pub message: MessageRef,
}

/// A bare reference to a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRef {
    /// Message id.
    pub id: String,

    /// Thread the message belongs to.
    #[serde(rename = "threadId", default)]
    pub thread_id: Option<String>,

    /// Labels, when the API includes them.
    #[serde(rename = "labelIds", default)]
    pub label_ids: Option<Vec<String>>,
}

/// A full message resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailMessage {
    /// Message id.
    pub id: String,

    /// Thread id.
    #[serde(rename = "threadId", default)]
    pub thread_id: Option<String>,

    /// Current labels on the message.
    #[serde(rename = "labelIds", default)]
    pub label_ids: Option<Vec<String>>,

    /// Short preview text.
    #[serde(default)]
    pub snippet: Option<String>,

    /// Internal timestamp as epoch milliseconds (string).
    #[serde(rename = "internalDate", default)]
    pub internal_date: Option<String>,

    /// MIME payload; headers are the part the assistant surfaces.
    #[serde(default)]
    pub payload: Option<MessagePayload>,
}

impl GmailMessage {
    /// Whether the message currently carries the given label.
    pub fn has_label(&self, label: &str) -> bool {
        self.label_ids
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|l| l == label)
    }

    /// Whether the message is currently in the inbox.
    pub fn is_inbox(&self) -> bool {
        self.has_label(INBOX_LABEL)
    }

    /// Look up a header value by name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// MIME payload of a message. Only headers and type are modeled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    /// MIME type of this part.
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,

    /// RFC822 headers.
    #[serde(default)]
    pub headers: Option<Vec<MessageHeader>>,
}

/// One RFC822 header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Header name.
    pub name: String,

    /// Header value.
    pub value: String,
}

/// Response from `users.messages.list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    /// Message refs on this page.
    pub messages: Option<Vec<MessageRef>>,

    /// Continuation token.
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,

    /// Server-side estimate of the total result count.
    #[serde(rename = "resultSizeEstimate")]
    pub result_size_estimate: Option<u64>,
}

/// An outbound message to be sent from the user's mailbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Recipient address.
    pub to: String,

    /// Subject line.
    pub subject: String,

    /// Plain-text body.
    pub body: String,
}

impl OutgoingMessage {
    /// Encode as the base64url `raw` field `users.messages.send` expects.
    pub fn to_raw(&self) -> String {
        let rfc822 = format!(
            "To: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            self.to, self.subject, self.body
        );
        URL_SAFE_NO_PAD.encode(rfc822.as_bytes())
    }
}
