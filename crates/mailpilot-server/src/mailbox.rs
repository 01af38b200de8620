//! Watch registration and mailbox CRUD routes.
//!
//! Thin authenticated wrappers: resolve the identity, look up its
//! credentials, delegate to the mailbox provider.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use mailpilot_core::IdentityStore;
use mailpilot_gmail::types::{
    GmailMessage, ListMessagesResponse, MessageRef, OutgoingMessage,
};
use mailpilot_gmail::MailboxProvider;
use mailpilot_types::identity::MailCredentials;

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::ApiState;

/// Page size when the client does not ask for one.
const DEFAULT_PAGE_SIZE: usize = 25;

/// Response body for the watch-registration action.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchActionResponse {
    /// Always true on a 2xx response.
    pub success: bool,

    /// Cursor the watch is anchored at.
    pub history_id: String,

    /// When the watch expires.
    pub expiration: DateTime<Utc>,

    /// True when the existing watch was fresh enough to keep.
    pub skipped: bool,
}

/// `POST /watch` -- ensure a live watch for the authenticated identity.
pub async fn register_watch(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<WatchActionResponse>, ApiError> {
    let identity = authenticate(&state, &headers, &query)?;
    let outcome = state.registrar.ensure_watch(&identity).await?;
    Ok(Json(WatchActionResponse {
        success: true,
        history_id: outcome.history_id,
        expiration: outcome.expiration,
        skipped: outcome.skipped,
    }))
}

async fn credentials_for(
    state: &ApiState,
    identity: &str,
) -> Result<MailCredentials, ApiError> {
    state
        .store
        .get(identity)
        .await
        .map(|record| record.credentials)
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                format!("unknown identity: {identity}"),
            )
        })
}

/// `GET /messages` -- list inbox message refs.
pub async fn list_messages(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ListMessagesResponse>, ApiError> {
    let identity = authenticate(&state, &headers, &query)?;
    let creds = credentials_for(&state, &identity).await?;

    let max_results = query
        .get("max_results")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let page_token = query.get("page_token").map(String::as_str);

    let page = state
        .mailbox
        .list_messages(&creds, max_results, page_token)
        .await?;
    Ok(Json(page))
}

/// `GET /messages/{id}` -- fetch one full message.
pub async fn get_message(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Path(id): Path<String>,
) -> Result<Json<GmailMessage>, ApiError> {
    let identity = authenticate(&state, &headers, &query)?;
    let creds = credentials_for(&state, &identity).await?;
    let message = state.mailbox.fetch_message(&creds, &id).await?;
    Ok(Json(message))
}

/// `POST /messages/send` -- send a message from the user's mailbox.
pub async fn send_message(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(message): Json<OutgoingMessage>,
) -> Result<Json<MessageRef>, ApiError> {
    let identity = authenticate(&state, &headers, &query)?;
    let creds = credentials_for(&state, &identity).await?;
    let sent = state.mailbox.send_message(&creds, &message).await?;
    Ok(Json(sent))
}

/// `POST /messages/{id}/trash` -- move a message to the trash.
pub async fn trash_message(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let identity = authenticate(&state, &headers, &query)?;
    let creds = credentials_for(&state, &identity).await?;
    state.mailbox.trash_message(&creds, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /messages/{id}/read` -- clear the unread label.
pub async fn mark_read(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let identity = authenticate(&state, &headers, &query)?;
    let creds = credentials_for(&state, &identity).await?;
    state.mailbox.mark_read(&creds, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
