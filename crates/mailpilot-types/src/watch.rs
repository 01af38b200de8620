//! Derived watch-subscription state.
//!
//! The identity row stores a bare `watch_expiration` timestamp. Every
//! decision about whether to (re-)register a provider watch branches on
//! the [`WatchState`] computed here instead of re-deriving threshold
//! comparisons at each call site.

use chrono::{DateTime, Duration, Utc};

/// How much lifetime must remain on a watch before renewal is skipped.
///
/// A watch expiring within this margin is treated as in need of renewal
/// even though it is still technically live.
pub const RENEWAL_MARGIN_SECS: i64 = 3600;

/// The watch lifecycle as a tagged view over `(now, watch_expiration)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No watch has ever been registered.
    Unregistered,

    /// A watch is live with more than the renewal margin remaining.
    Active {
        /// Absolute expiration instant.
        expires_at: DateTime<Utc>,
    },

    /// A watch is live but inside the renewal margin.
    ExpiringSoon {
        /// Absolute expiration instant.
        expires_at: DateTime<Utc>,
    },

    /// The watch expired in the past.
    Expired {
        /// When it lapsed.
        expired_at: DateTime<Utc>,
    },
}

impl WatchState {
    /// Classify a stored expiration timestamp against `now`.
    pub fn classify(now: DateTime<Utc>, expiration: Option<DateTime<Utc>>) -> Self {
        let Some(expires_at) = expiration else {
            return WatchState::Unregistered;
        };
        if expires_at <= now {
            return WatchState::Expired {
                expired_at: expires_at,
            };
        }
        if expires_at - now > Duration::seconds(RENEWAL_MARGIN_SECS) {
            WatchState::Active { expires_at }
        } else {
            WatchState::ExpiringSoon { expires_at }
        }
    }

    /// Whether the registrar should contact the provider.
    ///
    /// Only a comfortably-live watch skips registration.
    pub fn needs_registration(&self) -> bool {
        !matches!(self, WatchState::Active { .. })
    }
}
