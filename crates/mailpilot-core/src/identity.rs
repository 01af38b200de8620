//! The identity store seam and its in-process implementation.
//!
//! Cursor and watch fields are only ever written through the narrow
//! update methods here, each scoped to a single identity row. The
//! pipeline never takes a lock across identities.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use mailpilot_types::identity::IdentityRecord;

use crate::error::{CoreError, Result};

/// Durable per-identity state the sync pipeline reads and writes.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fetch an identity row, if one exists.
    async fn get(&self, identity: &str) -> Option<IdentityRecord>;

    /// Insert or replace an identity row.
    async fn upsert(&self, record: IdentityRecord);

    /// Advance the history cursor for one identity.
    async fn update_cursor(&self, identity: &str, history_id: &str) -> Result<()>;

    /// Record a fresh watch registration: cursor and expiration together.
    async fn update_watch(
        &self,
        identity: &str,
        history_id: &str,
        expiration: DateTime<Utc>,
    ) -> Result<()>;
}

/// In-memory identity store.
///
/// The process-local implementation used by the server and by tests.
/// Durability is a deployment concern; the remote mailbox remains the
/// source of truth and can always be re-synced.
#[derive(Default)]
pub struct MemoryIdentityStore {
    rows: RwLock<HashMap<String, IdentityRecord>>,
}

impl MemoryIdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get(&self, identity: &str) -> Option<IdentityRecord> {
        self.rows.read().await.get(identity).cloned()
    }

    async fn upsert(&self, record: IdentityRecord) {
        self.rows
            .write()
            .await
            .insert(record.identity.clone(), record);
    }

    async fn update_cursor(&self, identity: &str, history_id: &str) -> Result<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(identity)
            .ok_or_else(|| CoreError::UnknownIdentity(identity.to_owned()))?;
        row.last_history_id = Some(history_id.to_owned());
        Ok(())
    }

    async fn update_watch(
        &self,
        identity: &str,
        history_id: &str,
        expiration: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(identity)
            .ok_or_else(|| CoreError::UnknownIdentity(identity.to_owned()))?;
        row.last_history_id = Some(history_id.to_owned());
        row.watch_expiration = Some(expiration);
        Ok(())
    }
}
