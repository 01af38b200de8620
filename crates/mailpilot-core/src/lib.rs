//! The mailpilot sync core.
//!
//! Everything between an inbound Gmail push notification and the frames a
//! live client sees lives here:
//!
//! - [`notify`] -- decodes the opaque Pub/Sub envelope into an identity
//!   and a cursor hint.
//! - [`watch`] -- keeps a push watch registered with the provider,
//!   skipping redundant renewals.
//! - [`reconcile`] -- walks the history delta since the stored cursor,
//!   fetches qualifying messages, and advances the cursor.
//! - [`hub`] -- fans resulting events out to every live connection an
//!   identity holds.
//! - [`identity`] -- the per-user durable row the pipeline reads and
//!   writes, behind a store trait.
//! - [`auth`] -- bearer-token verification for the real-time endpoints.
//!
//! The core holds no HTTP types; the server crate owns transports and
//! injects the collaborators defined here.

pub mod auth;
pub mod error;
pub mod hub;
pub mod identity;
pub mod notify;
pub mod reconcile;
pub mod watch;

pub use auth::{AuthVerifier, HmacAuthVerifier};
pub use error::{CoreError, Result};
pub use hub::{ChannelHandle, EventHub};
pub use identity::{IdentityStore, MemoryIdentityStore};
pub use notify::{decode_push, PushNotification};
pub use reconcile::Reconciler;
pub use watch::{WatchOutcome, WatchRegistrar};
