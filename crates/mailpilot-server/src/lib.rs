//! HTTP surface for mailpilot.
//!
//! Owns the axum router and the [`ApiState`] every handler shares. The
//! interesting endpoints are the two real-time ones:
//!
//! - `POST /notifications/gmail` acknowledges a Pub/Sub push within its
//!   ack deadline and hands reconciliation to a detached task.
//! - `GET /events` upgrades to a long-lived SSE stream whose lifecycle
//!   is managed per connection.
//!
//! Everything else (watch registration, mailbox CRUD, chat) is a thin
//! authenticated wrapper over the injected collaborators.

pub mod auth;
pub mod chat;
pub mod error;
pub mod mailbox;
pub mod notifications;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use mailpilot_core::{AuthVerifier, EventHub, IdentityStore, Reconciler, WatchRegistrar};
use mailpilot_gmail::MailboxProvider;
use mailpilot_llm::ChatProvider;

/// Shared state accessible by all API handlers.
#[derive(Clone)]
pub struct ApiState {
    /// Live-connection registry.
    pub hub: Arc<EventHub>,

    /// Per-identity durable rows.
    pub store: Arc<dyn IdentityStore>,

    /// Remote mailbox operations.
    pub mailbox: Arc<dyn MailboxProvider>,

    /// Assistant model relay.
    pub chat: Arc<dyn ChatProvider>,

    /// Bearer-credential verification.
    pub auth: Arc<dyn AuthVerifier>,

    /// Watch registration.
    pub registrar: Arc<WatchRegistrar>,

    /// History reconciliation.
    pub reconciler: Arc<Reconciler>,

    /// Model identifier for chat requests.
    pub chat_model: String,
}

/// Build the full router with CORS and request tracing.
pub fn build_router(state: ApiState, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/notifications/gmail", post(notifications::gmail_push))
        .route("/events", get(stream::event_stream))
        .route("/watch", post(mailbox::register_watch))
        .route("/messages", get(mailbox::list_messages))
        .route("/messages/send", post(mailbox::send_message))
        .route("/messages/{id}", get(mailbox::get_message))
        .route("/messages/{id}/trash", post(mailbox::trash_message))
        .route("/messages/{id}/read", post(mailbox::mark_read))
        .route("/chat", post(chat::chat))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
