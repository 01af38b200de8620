//! Watch registration.
//!
//! A provider watch is what makes push notifications flow at all. The
//! registrar is idempotent: a watch that is still comfortably live is
//! left alone, so repeated "start watching my mail" requests do not
//! hammer the provider.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use mailpilot_gmail::MailboxProvider;
use mailpilot_types::watch::WatchState;

use crate::error::{CoreError, Result};
use crate::identity::IdentityStore;

/// Result of an [`ensure_watch`](WatchRegistrar::ensure_watch) call.
#[derive(Debug, Clone)]
pub struct WatchOutcome {
    /// Cursor the watch is anchored at.
    pub history_id: String,

    /// When the watch expires.
    pub expiration: DateTime<Utc>,

    /// True when the existing watch was fresh enough to keep and the
    /// provider was never contacted.
    pub skipped: bool,
}

/// Keeps exactly one live watch per identity.
pub struct WatchRegistrar {
    store: Arc<dyn IdentityStore>,
    provider: Arc<dyn MailboxProvider>,
    topic: String,
}

impl WatchRegistrar {
    /// Build a registrar publishing watches to `topic`.
    pub fn new(
        store: Arc<dyn IdentityStore>,
        provider: Arc<dyn MailboxProvider>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            topic: topic.into(),
        }
    }

    /// Ensure a live watch exists for `identity`.
    ///
    /// Renewal is skipped while the stored watch has more than the
    /// renewal margin remaining; otherwise the provider registers a
    /// fresh watch and both cursor fields are persisted. Only this one
    /// identity's row is touched.
    pub async fn ensure_watch(&self, identity: &str) -> Result<WatchOutcome> {
        let record = self
            .store
            .get(identity)
            .await
            .ok_or_else(|| CoreError::UnknownIdentity(identity.to_owned()))?;

        let state = WatchState::classify(Utc::now(), record.watch_expiration);
        if let (WatchState::Active { expires_at }, Some(history_id)) =
            (state, record.last_history_id)
        {
            debug!(
                identity = %identity,
                expires_at = %expires_at,
                "watch still active, skipping registration"
            );
            return Ok(WatchOutcome {
                history_id,
                expiration: expires_at,
                skipped: true,
            });
        }

        let response = self
            .provider
            .register_watch(&record.credentials, &self.topic)
            .await
            .map_err(|e| CoreError::WatchRegistrationFailed {
                message: e.to_string(),
            })?;

        let expiration =
            response
                .expiration_time()
                .ok_or_else(|| CoreError::WatchRegistrationFailed {
                    message: format!("unparseable expiration: {}", response.expiration),
                })?;

        self.store
            .update_watch(identity, &response.history_id, expiration)
            .await?;

        info!(
            identity = %identity,
            history_id = %response.history_id,
            expiration = %expiration,
            "watch registered"
        );

        Ok(WatchOutcome {
            history_id: response.history_id,
            expiration,
            skipped: false,
        })
    }
}
