//! # Meeplo Testing
//!
//! Testing utilities and helpers for the Meeplo remote-state synchronization core.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (`FixedClock`, `MockTransport`)
//! - A given/when/then harness for reducers (`ReducerTest`)
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use meeplo_testing::{MockTransport, test_clock};
//!
//! #[tokio::test]
//! async fn test_user_fetch() {
//!     let transport = Arc::new(MockTransport::new());
//!     transport.respond_json(Method::Get, "/member", json!({ "id": 1, "nickname": "sloth" }));
//!
//!     let store = Store::new(SyncState::default(), SyncReducer, env(transport));
//!     store.send(SyncAction::Dispatch(api::get_user_info())).await?;
//! }
//! ```

use chrono::{DateTime, Utc};
use meeplo_core::environment::Clock;


/// Scripted transport for driving remote calls in tests
pub mod transport_mock;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use meeplo_testing::mocks::FixedClock;
    /// use meeplo_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
pub use transport_mock::{Gate, MockTransport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
