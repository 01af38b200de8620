//! Inbound push-notification endpoint.
//!
//! Pub/Sub expects an acknowledgment within its ack deadline no matter
//! how long reconciliation takes, so the handler decodes, acks,
//! and hands the rest to a detached task. Whatever that task hits --
//! stale cursors, provider hiccups, nobody connected -- is observable
//! only through logs; the transport has no way to receive it.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::{debug, error, info, warn};

use mailpilot_core::notify::{decode_push, PushNotification};
use mailpilot_types::event::StreamEvent;

use crate::error::ApiError;
use crate::ApiState;

/// `POST /notifications/gmail`
///
/// Malformed envelopes are rejected with 400 (redelivery cannot fix a
/// bad envelope); everything else is acknowledged with 204 immediately.
pub async fn gmail_push(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let push = decode_push(&body).inspect_err(|e| {
        warn!(error = %e, "dropping malformed push notification");
    })?;

    info!(
        identity = %push.identity,
        cursor_hint = %push.cursor_hint,
        delivery_id = %push.delivery_id,
        "push notification accepted"
    );

    // Fire-and-continue: the ack goes out now, the work happens behind it.
    tokio::spawn(process_notification(state, push));

    Ok(StatusCode::NO_CONTENT)
}

/// The detached half of notification handling: reconcile, then fan out.
pub(crate) async fn process_notification(state: ApiState, push: PushNotification) {
    let change = match state
        .reconciler
        .reconcile(&push.identity, &push.cursor_hint)
        .await
    {
        Ok(change) => change,
        Err(e) => {
            error!(
                identity = %push.identity,
                delivery_id = %push.delivery_id,
                error = %e,
                "reconciliation failed"
            );
            return;
        }
    };

    if change.resync_required {
        let delivered = state
            .hub
            .send_to_identity(&change.identity, &StreamEvent::sync_stale(&change.identity));
        if !delivered {
            debug!(identity = %change.identity, "stale-cursor signal missed, no live channels");
        }
        return;
    }

    for message_id in &change.new_message_ids {
        let delivered = state
            .hub
            .send_to_identity(&change.identity, &StreamEvent::email_new(message_id));
        if !delivered {
            debug!(
                identity = %change.identity,
                message_id = %message_id,
                "new-mail event missed, no live channels"
            );
        }
    }
}
