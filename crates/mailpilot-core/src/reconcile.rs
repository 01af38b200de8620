//! History reconciliation.
//!
//! One reconciliation pass turns a push notification into the list of
//! genuinely-new inbox messages for an identity, advancing the stored
//! cursor as it goes. The pass is deliberately bounded: at most
//! [`MAX_FETCH_PER_PASS`] messages are fetched in full, and a cursor the
//! provider can no longer resolve degrades into a full-resync signal
//! instead of an error.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use mailpilot_gmail::{GmailError, MailboxProvider};
use mailpilot_types::identity::ChangeRecord;

use crate::error::{CoreError, Result};
use crate::identity::IdentityStore;

/// Upper bound on full-message fetches per reconciliation pass.
///
/// Bounds notification-handling latency. Messages beyond the cap are not
/// lost: the cursor only advances to the notification's hint, and the
/// provider's history listing is cumulative from any older cursor, so
/// the excess reappears in the next pass's delta window.
pub const MAX_FETCH_PER_PASS: usize = 5;

/// Runs reconciliation passes against the provider and identity store.
pub struct Reconciler {
    store: Arc<dyn IdentityStore>,
    provider: Arc<dyn MailboxProvider>,
}

impl Reconciler {
    /// Build a reconciler over the given collaborators.
    pub fn new(store: Arc<dyn IdentityStore>, provider: Arc<dyn MailboxProvider>) -> Self {
        Self { store, provider }
    }

    /// Reconcile one identity against a notification's cursor hint.
    ///
    /// On a stale cursor the stored cursor is left untouched and the
    /// returned record asks for a full resync. On every other success
    /// path the cursor advances to `cursor_hint`, even when zero new
    /// messages qualified, which makes replayed notifications no-ops.
    pub async fn reconcile(&self, identity: &str, cursor_hint: &str) -> Result<ChangeRecord> {
        let record = self
            .store
            .get(identity)
            .await
            .ok_or_else(|| CoreError::UnknownIdentity(identity.to_owned()))?;

        // First sync for this identity: the notification's own cursor is
        // the only starting point there is.
        let start = record
            .last_history_id
            .clone()
            .unwrap_or_else(|| cursor_hint.to_owned());

        let delta = match self
            .provider
            .list_history_since(&record.credentials, &start)
            .await
        {
            Ok(delta) => delta,
            Err(GmailError::StaleCursor) => {
                warn!(
                    identity = %identity,
                    start_cursor = %start,
                    "history cursor too old, requesting full resync"
                );
                return Ok(ChangeRecord::resync(identity));
            }
            Err(e) => return Err(e.into()),
        };

        // Sequential, deterministic walk of the delta to decide what to
        // fetch; duplicates across records collapse to first occurrence.
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for rec in delta.records() {
            for message in rec.added() {
                if seen.insert(message.id.clone()) {
                    candidates.push(message.id.clone());
                }
            }
        }

        let deferred = candidates.len().saturating_sub(MAX_FETCH_PER_PASS);
        if deferred > 0 {
            debug!(
                identity = %identity,
                deferred,
                "capping message fetches, excess deferred to next pass"
            );
            candidates.truncate(MAX_FETCH_PER_PASS);
        }

        // The fetches themselves run concurrently; order of results
        // follows the delta order of the candidates.
        let fetches = candidates
            .iter()
            .map(|id| self.provider.fetch_message(&record.credentials, id));
        let results = join_all(fetches).await;

        let mut new_message_ids = Vec::new();
        for (id, result) in candidates.iter().zip(results) {
            match result {
                // Label check happens against live message state: a
                // message routed out of the inbox between the history
                // event and now is not surfaced.
                Ok(message) if message.is_inbox() => new_message_ids.push(id.clone()),
                Ok(_) => {
                    debug!(
                        identity = %identity,
                        message_id = %id,
                        "message no longer in inbox, dropping"
                    );
                }
                Err(e) => {
                    warn!(
                        identity = %identity,
                        message_id = %id,
                        error = %e,
                        "message fetch failed, skipping"
                    );
                }
            }
        }

        self.store.update_cursor(identity, cursor_hint).await?;
        debug!(
            identity = %identity,
            cursor = %cursor_hint,
            new_messages = new_message_ids.len(),
            "reconciliation pass complete"
        );

        Ok(ChangeRecord::updated(identity, new_message_ids))
    }
}
