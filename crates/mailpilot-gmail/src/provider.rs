//! The mailbox-provider seam.
//!
//! Everything above the provider (reconciler, registrar, HTTP routes)
//! depends on this trait, never on [`GmailClient`](crate::GmailClient)
//! directly, so tests can substitute scripted providers.

use async_trait::async_trait;

use mailpilot_types::identity::MailCredentials;

use crate::error::Result;
use crate::types::{
    GmailMessage, HistoryResponse, ListMessagesResponse, MessageRef, OutgoingMessage,
    WatchResponse,
};

/// Remote mailbox operations the rest of the system needs.
///
/// Implementations are stateless per call: credentials arrive as an
/// argument so one instance serves every identity.
#[async_trait]
pub trait MailboxProvider: Send + Sync {
    /// Register (or re-register) a push watch publishing to `topic`.
    async fn register_watch(
        &self,
        creds: &MailCredentials,
        topic: &str,
    ) -> Result<WatchResponse>;

    /// List the change delta since `start_history_id`, all pages merged.
    ///
    /// Returns [`GmailError::StaleCursor`](crate::GmailError::StaleCursor)
    /// when the cursor is too old to resolve.
    async fn list_history_since(
        &self,
        creds: &MailCredentials,
        start_history_id: &str,
    ) -> Result<HistoryResponse>;

    /// Fetch one full message by id.
    async fn fetch_message(&self, creds: &MailCredentials, id: &str) -> Result<GmailMessage>;

    /// List message refs, newest first.
    async fn list_messages(
        &self,
        creds: &MailCredentials,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse>;

    /// Send a message from the user's mailbox.
    async fn send_message(
        &self,
        creds: &MailCredentials,
        message: &OutgoingMessage,
    ) -> Result<MessageRef>;

    /// Move a message to the trash.
    async fn trash_message(&self, creds: &MailCredentials, id: &str) -> Result<()>;

    /// Clear the unread label from a message.
    async fn mark_read(&self, creds: &MailCredentials, id: &str) -> Result<()>;
}
