//! The real-time SSE endpoint and per-connection lifecycle.
//!
//! A connection moves through: credential check (before any channel
//! exists), registration with the hub, an initial `connected` frame,
//! then whatever the hub delivers, with comment keep-alives holding the
//! transport open through intermediary timeouts. Teardown runs exactly
//! once no matter how many close signals race -- transport drop and
//! server shutdown both funnel through the same guard.
//!
//! There is no replay: events missed while disconnected are gone, and
//! clients recover by re-fetching state on reconnect.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use futures_util::future;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use mailpilot_core::hub::{ChannelHandle, EventHub};
use mailpilot_types::event::StreamEvent;

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::ApiState;

/// Interval between comment keep-alive frames.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Unregisters a channel from the hub exactly once.
pub(crate) struct ConnectionGuard {
    hub: Arc<EventHub>,
    identity: String,
    channel_id: Uuid,
    closed: AtomicBool,
}

impl ConnectionGuard {
    pub(crate) fn new(hub: Arc<EventHub>, identity: String, channel_id: Uuid) -> Self {
        Self {
            hub,
            identity,
            channel_id,
            closed: AtomicBool::new(false),
        }
    }

    /// Tear the connection down. Safe to call any number of times;
    /// only the first call unregisters.
    pub(crate) fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.hub.unregister(&self.identity, self.channel_id);
            info!(
                identity = %self.identity,
                channel = %self.channel_id,
                "stream disconnected"
            );
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.close();
    }
}

/// The frames a single connection will carry: the initial `connected`
/// event, then everything the hub sends to its channel.
fn event_source(
    identity: String,
    receiver: mpsc::UnboundedReceiver<StreamEvent>,
) -> impl Stream<Item = StreamEvent> {
    let initial = StreamEvent::connected(&identity);
    let live = stream::unfold(receiver, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    });
    stream::once(future::ready(initial)).chain(live)
}

/// `GET /events`
///
/// Upgrades to a long-lived SSE stream for the authenticated identity.
pub async fn event_stream(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    // No channel exists until the credential resolves.
    let identity = authenticate(&state, &headers, &query)?;

    let (handle, receiver) = ChannelHandle::new();
    let guard = ConnectionGuard::new(state.hub.clone(), identity.clone(), handle.id());
    state.hub.register(&identity, handle);
    info!(
        identity = %identity,
        connections = state.hub.connection_count(),
        "stream connected"
    );

    // The guard rides inside the stream: when the client disconnects,
    // axum drops the stream and the drop unregisters the channel.
    let events = event_source(identity, receiver).map(move |event| {
        let _held = &guard;
        Ok(Event::default().event(event.name).data(event.data.to_string()))
    });

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    ))
}
