//! Mailbox identities and reconciliation outcomes.
//!
//! An [`IdentityRecord`] is the durable per-user row the sync pipeline
//! operates on: who the mailbox belongs to, where their history cursor
//! stands, when their provider watch expires, and the credentials needed
//! to talk to the provider on their behalf.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::secret::SecretString;

/// OAuth credential pair for one mailbox.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailCredentials {
    /// Short-lived access token.
    pub access_token: SecretString,

    /// Long-lived refresh token used to mint new access tokens.
    pub refresh_token: SecretString,
}

/// Durable state for one user's mailbox.
///
/// The cursor fields are only ever written by the watch registrar (on
/// registration) and the history reconciler (after a successful delta
/// fetch). There is at most one authoritative cursor per identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Stable key naming the mailbox, e.g. a verified email address.
    pub identity: String,

    /// Opaque provider-issued cursor into the mailbox change log.
    /// `None` until the first successful sync.
    pub last_history_id: Option<String>,

    /// When the active provider watch expires. `None` if no watch exists.
    pub watch_expiration: Option<DateTime<Utc>>,

    /// Remote credentials for this mailbox.
    pub credentials: MailCredentials,
}

impl IdentityRecord {
    /// Create a fresh record with no sync history and no active watch.
    pub fn new(identity: impl Into<String>, credentials: MailCredentials) -> Self {
        Self {
            identity: identity.into(),
            last_history_id: None,
            watch_expiration: None,
            credentials,
        }
    }
}

/// The outcome of one reconciliation pass.
///
/// Ephemeral: produced per notification, handed straight to the fan-out
/// layer, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// The identity this pass ran for.
    pub identity: String,

    /// Newly arrived inbox messages, in provider delta order.
    pub new_message_ids: Vec<String>,

    /// The stored cursor was too old for the provider to resolve; the
    /// caller must trigger a full resync. `new_message_ids` is empty.
    pub resync_required: bool,
}

impl ChangeRecord {
    /// A normal (non-stale) outcome carrying zero or more new messages.
    pub fn updated(identity: impl Into<String>, new_message_ids: Vec<String>) -> Self {
        Self {
            identity: identity.into(),
            new_message_ids,
            resync_required: false,
        }
    }

    /// A stale-cursor outcome: no messages, full resync needed.
    pub fn resync(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            new_message_ids: Vec::new(),
            resync_required: true,
        }
    }
}
