//! Event fan-out hub.
//!
//! The one piece of process-wide shared state: a registry mapping each
//! identity to its live output channels. A user may hold any number of
//! concurrent channels (several open tabs), and delivery is best-effort
//! at-most-once per channel -- a dead channel never blocks the rest.
//!
//! Sends snapshot the channel set before writing, so registration and
//! teardown can interleave with an in-flight send without corruption.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use mailpilot_types::event::StreamEvent;

/// One live output channel, registered under exactly one identity.
pub struct ChannelHandle {
    id: Uuid,
    sender: mpsc::UnboundedSender<StreamEvent>,
    connected_at: DateTime<Utc>,
}

impl ChannelHandle {
    /// Create a handle and the receiving half the transport drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = Self {
            id: Uuid::new_v4(),
            sender,
            connected_at: Utc::now(),
        };
        (handle, receiver)
    }

    /// Unique id of this channel, used for targeted unregistration.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the channel was created.
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }
}

/// Process-wide registry of live channels, keyed by identity.
///
/// Constructed once at startup and injected wherever notifications or
/// connections are handled; tests build their own with fake channels.
#[derive(Default)]
pub struct EventHub {
    channels: RwLock<HashMap<String, Vec<ChannelHandle>>>,
}

impl EventHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel under an identity.
    pub fn register(&self, identity: &str, handle: ChannelHandle) {
        debug!(identity = %identity, channel = %handle.id, "registering channel");
        self.channels
            .write()
            .unwrap()
            .entry(identity.to_owned())
            .or_default()
            .push(handle);
    }

    /// Remove a channel. Idempotent; removing the last channel drops the
    /// identity's entry entirely so empty sets never accumulate.
    pub fn unregister(&self, identity: &str, channel_id: Uuid) {
        let mut channels = self.channels.write().unwrap();
        if let Some(set) = channels.get_mut(identity) {
            set.retain(|c| c.id != channel_id);
            if set.is_empty() {
                channels.remove(identity);
            }
            debug!(identity = %identity, channel = %channel_id, "unregistered channel");
        }
    }

    /// Deliver an event to every channel of one identity.
    ///
    /// Returns `false` when the identity has no live channels -- not an
    /// error, the user simply misses the live update. A send failure on
    /// one channel is logged and does not affect the others.
    pub fn send_to_identity(&self, identity: &str, event: &StreamEvent) -> bool {
        // Snapshot under the read lock, deliver outside it: a send must
        // never observe a half-removed channel, and teardown must never
        // wait on a slow delivery.
        let snapshot: Vec<(Uuid, mpsc::UnboundedSender<StreamEvent>)> = {
            let channels = self.channels.read().unwrap();
            match channels.get(identity) {
                Some(set) => set.iter().map(|c| (c.id, c.sender.clone())).collect(),
                None => Vec::new(),
            }
        };

        if snapshot.is_empty() {
            debug!(identity = %identity, event = %event.name, "no live channels, delivery missed");
            return false;
        }

        for (id, sender) in snapshot {
            if sender.send(event.clone()).is_err() {
                warn!(identity = %identity, channel = %id, "send to closed channel dropped");
            }
        }
        true
    }

    /// Deliver an event to every channel of every identity.
    pub fn broadcast(&self, event: &StreamEvent) {
        let snapshot: Vec<mpsc::UnboundedSender<StreamEvent>> = {
            let channels = self.channels.read().unwrap();
            channels
                .values()
                .flat_map(|set| set.iter().map(|c| c.sender.clone()))
                .collect()
        };

        for sender in snapshot {
            let _ = sender.send(event.clone());
        }
    }

    /// Total number of live channels across all identities.
    pub fn connection_count(&self) -> usize {
        self.channels.read().unwrap().values().map(Vec::len).sum()
    }
}
