//! Gmail mailbox provider for mailpilot.
//!
//! Exposes the [`MailboxProvider`] trait -- the seam the sync core and the
//! HTTP surface program against -- and [`GmailClient`], its implementation
//! over the Gmail REST API: watch registration, incremental history
//! listing, and the message read/write operations.
//!
//! The client is stateless with respect to identities: credentials are
//! passed per call, so one client serves every mailbox in the process.

pub mod client;
pub mod error;
pub mod provider;
pub mod types;

pub use client::GmailClient;
pub use error::{GmailError, Result};
pub use provider::MailboxProvider;
