//! # Meeplo Core
//!
//! Core traits and types for the Meeplo remote-state synchronization core.
//!
//! Every screen of the Meeplo client follows the same choreography: a view
//! dispatches an asynchronous remote call, the call settles, and a keyed slot of
//! remote-derived state transitions accordingly. This crate holds the pure half
//! of that choreography.
//!
//! ## Core Concepts
//!
//! - **Resource**: a named slot of remote-derived state ([`RemoteResource`])
//! - **Lifecycle event**: `Start`, `Success` or `Failure` ([`Lifecycle`])
//! - **Reducer**: pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: side effect descriptions (not execution)
//! - **Environment**: injected dependencies via traits ([`Transport`], [`environment::Clock`])
//!
//! ## Example
//!
//! ```
//! use meeplo_core::{Lifecycle, RemoteResource, ResourceStatus, Seq};
//! use chrono::Utc;
//!
//! let mut schedule: RemoteResource<u32> = RemoteResource::idle();
//! let seq = schedule.issue();
//! schedule.apply(Lifecycle::Start { seq });
//! assert_eq!(schedule.status(), ResourceStatus::Pending);
//!
//! schedule.apply(Lifecycle::Success { seq, payload: 5, at: Utc::now() });
//! assert_eq!(schedule.data(), Some(&5));
//! assert_eq!(schedule.applied(), Seq::new(1));
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

/// Remote call error taxonomy
pub mod error;

/// Resource keys (the naming contract shared by the store and actions)
pub mod key;

/// Lifecycle events and sequence tokens
pub mod lifecycle;

/// `RemoteResource` and the keyed `ResourceMap`
pub mod resource;

/// Transport boundary: request descriptors and the `Transport` trait
pub mod transport;

pub use error::{ErrorKind, RemoteError};
pub use key::ResourceKey;
pub use lifecycle::{Lifecycle, Seq};
pub use resource::{Applied, OrderingPolicy, RemoteResource, ResourceMap, ResourceStatus, StalePolicy};
pub use transport::{Method, Request, Response, Transport};

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all state transitions and are deterministic and testable.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for SyncReducer {
    ///     type State = SyncState;
    ///     type Action = SyncAction;
    ///     type Environment = SyncEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut SyncState,
    ///         action: SyncAction,
    ///         env: &SyncEnvironment,
    ///     ) -> SmallVec<[Effect<SyncAction>; 4]> {
    ///         match action {
    ///             SyncAction::Lifecycle { key, event } => {
    ///                 state.resources.apply(&key, event);
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Updates state in place
        /// 2. Returns effect descriptions to be executed
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are cancellable by id.
pub mod effect {
    use crate::key::ResourceKey;
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;

    /// Identifier used to cancel in-flight effects
    ///
    /// Remote calls are registered under the id of the resource they feed, so
    /// cancelling a key aborts every outstanding call for it.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EffectId(String);

    impl EffectId {
        /// Create a new effect id
        #[must_use]
        pub fn new(id: impl Into<String>) -> Self {
            Self(id.into())
        }

        /// Get the id as a string slice
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl fmt::Display for EffectId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl From<&ResourceKey> for EffectId {
        fn from(key: &ResourceKey) -> Self {
            Self(key.as_str().to_string())
        }
    }

    impl From<&str> for EffectId {
        fn from(id: &str) -> Self {
            Self(id.to_string())
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Run `effect` registered under `id` so it can be aborted later
        Cancellable {
            /// Cancellation id
            id: EffectId,
            /// The effect to run
            effect: Box<Effect<Action>>,
        },

        /// Abort every in-flight effect registered under the id
        Cancel(EffectId),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an effect so it is registered under `id`
        #[must_use]
        pub fn cancellable(id: impl Into<EffectId>, effect: Effect<Action>) -> Effect<Action> {
            Effect::Cancellable {
                id: id.into(),
                effect: Box::new(effect),
            }
        }

        /// Build an `Effect::Future` from any sendable future
        #[must_use]
        pub fn future<F>(fut: F) -> Effect<Action>
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter. The transport lives in [`crate::transport`].
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use meeplo_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
