//! The conversational route.
//!
//! A stateless relay to the assistant provider. Non-streaming requests
//! get the reply in the response body; streaming requests are accepted
//! immediately and the tokens ride the caller's live event channel as
//! `chat:token` frames, closed out by `chat:done`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use mailpilot_core::EventHub;
use mailpilot_llm::{ChatMessage, ChatProvider, ChatRequest, StreamChunk};
use mailpilot_types::event::StreamEvent;

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::ApiState;

/// Framing instruction sent ahead of every user turn.
const SYSTEM_PROMPT: &str =
    "You are mailpilot, an assistant that helps the user read, search, and \
     manage their email through conversation. Be concise.";

/// Request body for `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    /// The user's message.
    pub message: String,

    /// When true, tokens are fanned out on the live event channel
    /// instead of returned in the response.
    #[serde(default)]
    pub stream: bool,
}

/// Response body for `POST /chat`.
#[derive(Debug, Serialize)]
pub struct ChatReply {
    /// The assistant's reply; absent when streaming.
    pub reply: Option<String>,

    /// Whether tokens are being delivered over the event channel.
    pub streaming: bool,
}

/// `POST /chat`
pub async fn chat(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<ChatBody>,
) -> Result<(StatusCode, Json<ChatReply>), ApiError> {
    let identity = authenticate(&state, &headers, &query)?;

    let request = ChatRequest::new(
        state.chat_model.clone(),
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(body.message),
        ],
    );

    if body.stream {
        let receiver = state.chat.stream(&request).await?;
        tokio::spawn(relay_chat_stream(state.hub.clone(), identity, receiver));
        return Ok((
            StatusCode::ACCEPTED,
            Json(ChatReply {
                reply: None,
                streaming: true,
            }),
        ));
    }

    let response = state.chat.complete(&request).await?;
    Ok((
        StatusCode::OK,
        Json(ChatReply {
            reply: response.text().map(str::to_owned),
            streaming: false,
        }),
    ))
}

/// Forward streamed tokens onto the identity's live channels.
///
/// Always closes with `chat:done`, even when the provider stream ends
/// without a sentinel.
pub(crate) async fn relay_chat_stream(
    hub: Arc<EventHub>,
    identity: String,
    mut receiver: mpsc::Receiver<StreamChunk>,
) {
    while let Some(chunk) = receiver.recv().await {
        match chunk {
            StreamChunk::TextDelta(text) => {
                if !hub.send_to_identity(&identity, &StreamEvent::chat_token(&text)) {
                    debug!(identity = %identity, "chat token missed, no live channels");
                }
            }
            StreamChunk::Done => break,
        }
    }
    hub.send_to_identity(&identity, &StreamEvent::chat_done());
}
