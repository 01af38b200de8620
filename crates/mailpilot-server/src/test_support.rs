//! Shared test doubles for handler tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::mpsc;

use mailpilot_core::{
    EventHub, HmacAuthVerifier, IdentityStore, MemoryIdentityStore, Reconciler,
    WatchRegistrar,
};
use mailpilot_gmail::types::{
    GmailMessage, HistoryMessageChange, HistoryRecord, HistoryResponse, ListMessagesResponse,
    MessageRef, OutgoingMessage, WatchResponse,
};
use mailpilot_gmail::{GmailError, MailboxProvider, Result as GmailResult};
use mailpilot_llm::{ChatProvider, ChatRequest, ChatResponse, StreamChunk};
use mailpilot_llm::Result as LlmResult;
use mailpilot_types::identity::{IdentityRecord, MailCredentials};
use mailpilot_types::secret::SecretString;

use crate::ApiState;

pub(crate) const TEST_SECRET: &str = "server-test-secret";

/// Scripted mailbox provider for server tests.
#[derive(Default)]
pub(crate) struct StubMailbox {
    deltas: HashMap<String, Vec<&'static str>>,
    stale_cursors: HashSet<String>,
    not_in_inbox: HashSet<&'static str>,
}

impl StubMailbox {
    pub(crate) fn with_delta(mut self, start: &str, ids: Vec<&'static str>) -> Self {
        self.deltas.insert(start.to_owned(), ids);
        self
    }

    pub(crate) fn with_stale(mut self, cursor: &str) -> Self {
        self.stale_cursors.insert(cursor.to_owned());
        self
    }
}

#[async_trait]
impl MailboxProvider for StubMailbox {
    async fn register_watch(
        &self,
        _creds: &MailCredentials,
        _topic: &str,
    ) -> GmailResult<WatchResponse> {
        let expiration = (Utc::now() + Duration::days(7)).timestamp_millis();
        Ok(WatchResponse {
            history_id: "500".into(),
            expiration: expiration.to_string(),
        })
    }

    async fn list_history_since(
        &self,
        _creds: &MailCredentials,
        start: &str,
    ) -> GmailResult<HistoryResponse> {
        if self.stale_cursors.contains(start) {
            return Err(GmailError::StaleCursor);
        }
        let added: Vec<HistoryMessageChange> = self
            .deltas
            .get(start)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|id| HistoryMessageChange {
                message: MessageRef {
                    id: id.to_owned(),
                    thread_id: None,
                    label_ids: None,
                },
            })
            .collect();
        let history = (!added.is_empty()).then(|| {
            vec![HistoryRecord {
                id: "h1".into(),
                messages_added: Some(added),
                messages_deleted: None,
            }]
        });
        Ok(HistoryResponse {
            history,
            history_id: None,
            next_page_token: None,
        })
    }

    async fn fetch_message(
        &self,
        _creds: &MailCredentials,
        id: &str,
    ) -> GmailResult<GmailMessage> {
        let label = if self.not_in_inbox.contains(id) {
            "SPAM"
        } else {
            "INBOX"
        };
        Ok(serde_json::from_value(serde_json::json!({
            "id": id,
            "threadId": "t1",
            "labelIds": [label],
        }))
        .unwrap())
    }

    async fn list_messages(
        &self,
        _creds: &MailCredentials,
        _max: usize,
        _page: Option<&str>,
    ) -> GmailResult<ListMessagesResponse> {
        Ok(ListMessagesResponse {
            messages: Some(vec![MessageRef {
                id: "m1".into(),
                thread_id: Some("t1".into()),
                label_ids: None,
            }]),
            next_page_token: None,
            result_size_estimate: Some(1),
        })
    }

    async fn send_message(
        &self,
        _creds: &MailCredentials,
        _message: &OutgoingMessage,
    ) -> GmailResult<MessageRef> {
        Ok(MessageRef {
            id: "sent-1".into(),
            thread_id: Some("t1".into()),
            label_ids: None,
        })
    }

    async fn trash_message(&self, _creds: &MailCredentials, _id: &str) -> GmailResult<()> {
        Ok(())
    }

    async fn mark_read(&self, _creds: &MailCredentials, _id: &str) -> GmailResult<()> {
        Ok(())
    }
}

/// Scripted chat provider.
pub(crate) struct StubChat {
    reply: String,
    chunks: Vec<StreamChunk>,
}

impl StubChat {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_owned(),
            chunks: vec![StreamChunk::Done],
        }
    }

    pub(crate) fn streaming(chunks: Vec<StreamChunk>) -> Self {
        Self {
            reply: String::new(),
            chunks,
        }
    }
}

#[async_trait]
impl ChatProvider for StubChat {
    async fn complete(&self, _request: &ChatRequest) -> LlmResult<ChatResponse> {
        Ok(serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": self.reply}}],
        }))
        .unwrap())
    }

    async fn stream(
        &self,
        _request: &ChatRequest,
    ) -> LlmResult<mpsc::Receiver<StreamChunk>> {
        let (tx, rx) = mpsc::channel(16);
        let chunks = self.chunks.clone();
        tokio::spawn(async move {
            for chunk in chunks {
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

/// Assemble an [`ApiState`] over the given doubles.
pub(crate) fn test_state(
    mailbox: Arc<dyn MailboxProvider>,
    chat: Arc<dyn ChatProvider>,
) -> ApiState {
    let store = Arc::new(MemoryIdentityStore::new());
    let hub = Arc::new(EventHub::new());
    let auth = Arc::new(HmacAuthVerifier::new(&SecretString::new(TEST_SECRET)));
    let registrar = Arc::new(WatchRegistrar::new(
        store.clone(),
        mailbox.clone(),
        "projects/test/topics/push",
    ));
    let reconciler = Arc::new(Reconciler::new(store.clone(), mailbox.clone()));

    ApiState {
        hub,
        store,
        mailbox,
        chat,
        auth,
        registrar,
        reconciler,
        chat_model: "test-model".into(),
    }
}

/// Insert an identity row, optionally with a stored cursor.
pub(crate) async fn seed_identity(state: &ApiState, identity: &str, cursor: Option<&str>) {
    let mut record = IdentityRecord::new(identity, MailCredentials::default());
    record.last_history_id = cursor.map(str::to_owned);
    state.store.upsert(record).await;
}

/// Mint a valid bearer token for `identity` with the test secret.
pub(crate) fn mint_token(identity: &str) -> String {
    HmacAuthVerifier::new(&SecretString::new(TEST_SECRET)).mint(identity, Duration::hours(1))
}
