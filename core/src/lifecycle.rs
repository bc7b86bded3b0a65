//! Lifecycle events and sequence tokens.
//!
//! A dispatch produces exactly one `Start` followed by exactly one terminal
//! event. Every event carries the [`Seq`] issued for its dispatch so the store
//! can tell a fresh completion from a stale one.

use crate::error::RemoteError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic per-resource dispatch token.
///
/// `Seq::ZERO` is never issued; the first dispatch of a resource gets `Seq(1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Seq(u64);

impl Seq {
    /// The token of a resource that has never been dispatched.
    pub const ZERO: Self = Self(0);

    /// Create a token from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The token that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the three signals that drive a resource transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Lifecycle<T> {
    /// The dispatch was issued.
    Start {
        /// Token of the dispatch
        seq: Seq,
    },

    /// The call settled with a payload.
    Success {
        /// Token of the dispatch
        seq: Seq,
        /// Decoded payload
        payload: T,
        /// When the call settled
        at: DateTime<Utc>,
    },

    /// The call settled with an error.
    Failure {
        /// Token of the dispatch
        seq: Seq,
        /// Normalized error
        error: RemoteError,
        /// When the call settled
        at: DateTime<Utc>,
    },
}

impl<T> Lifecycle<T> {
    /// Token carried by the event.
    #[must_use]
    pub const fn seq(&self) -> Seq {
        match self {
            Self::Start { seq } | Self::Success { seq, .. } | Self::Failure { seq, .. } => *seq,
        }
    }

    /// Whether this is `Success` or `Failure`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Start { .. })
    }

    /// Short event name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        assert!(Seq::ZERO < Seq::ZERO.next());
        assert_eq!(Seq::new(7).next().get(), 8);
        assert_eq!(Seq::new(u64::MAX).next(), Seq::new(u64::MAX));
    }

    #[test]
    fn terminal_events_report_their_seq() {
        let event: Lifecycle<()> = Lifecycle::Failure {
            seq: Seq::new(3),
            error: RemoteError::network("connection refused"),
            at: Utc::now(),
        };
        assert!(event.is_terminal());
        assert_eq!(event.seq(), Seq::new(3));
        assert_eq!(event.name(), "failure");
        assert!(!Lifecycle::<()>::Start { seq: Seq::new(1) }.is_terminal());
    }
}
