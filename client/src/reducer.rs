//! The remote-state reducer.
//!
//! `SyncReducer` is the only writer of [`SyncState`]. A dispatch issues the
//! resource's next token, moves it to pending and returns the remote call as
//! a cancellable effect; the call's terminal event comes back as a
//! `Lifecycle` action and is routed through the seq guard.

use crate::action::AsyncAction;
use crate::api::{self, keys};
use crate::model::Payload;
use meeplo_core::effect::{Effect, EffectId};
use meeplo_core::environment::Clock;
use meeplo_core::error::RemoteError;
use meeplo_core::key::ResourceKey;
use meeplo_core::lifecycle::Lifecycle;
use meeplo_core::reducer::Reducer;
use meeplo_core::resource::{Applied, RemoteResource, ResourceMap};
use meeplo_core::transport::Transport;
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

/// Every remote-derived resource of the client.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    resources: ResourceMap<Payload>,
}

impl Default for SyncState {
    /// The full endpoint catalogue, idle.
    fn default() -> Self {
        Self::new(api::default_resources())
    }
}

impl SyncState {
    /// State over an explicit set of resources.
    #[must_use]
    pub const fn new(resources: ResourceMap<Payload>) -> Self {
        Self { resources }
    }

    /// All resources.
    #[must_use]
    pub const fn resources(&self) -> &ResourceMap<Payload> {
        &self.resources
    }

    /// One resource.
    #[must_use]
    pub fn resource(&self, key: &ResourceKey) -> Option<&RemoteResource<Payload>> {
        self.resources.get(key)
    }

    /// Whether the member has been loaded.
    ///
    /// Derived from the `user` resource: true once it holds a member, and
    /// while a refresh of that member is pending.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.resources
            .get(&ResourceKey::new(keys::USER))
            .and_then(RemoteResource::data)
            .and_then(Payload::as_user)
            .is_some()
    }
}

/// Actions of the remote-state store.
#[derive(Debug, Clone)]
pub enum SyncAction {
    /// Start a remote call
    Dispatch(AsyncAction),
    /// A call settled
    Lifecycle {
        /// Resource the event addresses
        key: ResourceKey,
        /// Start, success or failure
        event: Lifecycle<Payload>,
    },
    /// Abandon in-flight calls for a resource
    Cancel {
        /// Resource whose calls are abandoned
        key: ResourceKey,
    },
}

/// Dependencies of the remote-state reducer.
#[derive(Clone)]
pub struct SyncEnvironment {
    /// Executes remote calls
    pub transport: Arc<dyn Transport>,
    /// Stamps settled events
    pub clock: Arc<dyn Clock>,
}

impl SyncEnvironment {
    /// Environment over `transport` and `clock`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }
}

/// Reducer of [`SyncState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncReducer;

impl Reducer for SyncReducer {
    type State = SyncState;
    type Action = SyncAction;
    type Environment = SyncEnvironment;

    fn reduce(
        &self,
        state: &mut SyncState,
        action: SyncAction,
        env: &SyncEnvironment,
    ) -> SmallVec<[Effect<SyncAction>; 4]> {
        match action {
            SyncAction::Dispatch(action) => {
                let Some(seq) = state.resources.begin(&action.key) else {
                    tracing::warn!(resource = %action.key, action = action.name, "Dispatch to unregistered resource ignored");
                    return SmallVec::new();
                };
                tracing::debug!(resource = %action.key, seq = seq.get(), action = action.name, "Dispatched");

                let key = action.key.clone();
                let transport = Arc::clone(&env.transport);
                let clock = Arc::clone(&env.clock);

                smallvec![Effect::cancellable(
                    &key,
                    Effect::future(async move {
                        let key = action.key.clone();
                        let event = action.run(seq, transport.as_ref(), clock.as_ref()).await;
                        Some(SyncAction::Lifecycle { key, event })
                    }),
                )]
            },

            SyncAction::Lifecycle { key, event } => {
                let seq = event.seq();
                let name = event.name();
                match state.resources.apply(&key, event) {
                    Applied::Yes => tracing::trace!(resource = %key, seq = seq.get(), event = name, "Applied"),
                    Applied::Stale => {
                        tracing::debug!(resource = %key, seq = seq.get(), event = name, "Discarded stale event");
                        metrics::counter!("store.stale_events", "resource" => key.to_string()).increment(1);
                    },
                    Applied::Unknown => {
                        tracing::warn!(resource = %key, event = name, "Event for unregistered resource ignored");
                    },
                }
                SmallVec::new()
            },

            SyncAction::Cancel { key } => {
                if let Some(seq) = state.resources.abandon(&key, RemoteError::cancelled(), env.clock.now()) {
                    tracing::debug!(resource = %key, seq = seq.get(), "Cancelled pending call");
                }
                smallvec![Effect::Cancel(EffectId::from(&key))]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::model::UserInfo;
    use chrono::{DateTime, Utc};
    use meeplo_core::error::ErrorKind;
    use meeplo_core::lifecycle::Seq;
    use meeplo_core::resource::ResourceStatus;
    use meeplo_testing::{MockTransport, ReducerTest, assertions, test_clock};

    fn env() -> SyncEnvironment {
        SyncEnvironment::new(Arc::new(MockTransport::new()), Arc::new(test_clock()))
    }

    fn at() -> DateTime<Utc> {
        test_clock().now()
    }

    fn user() -> ResourceKey {
        ResourceKey::new(keys::USER)
    }

    fn member(nickname: &str) -> Payload {
        Payload::User(UserInfo {
            id: 1,
            nickname: nickname.to_string(),
            profile_photo: None,
            start_locations: Vec::new(),
        })
    }

    #[test]
    fn dispatch_marks_pending_and_schedules_call() {
        ReducerTest::new(SyncReducer)
            .with_env(env())
            .given_state(SyncState::default())
            .when_action(SyncAction::Dispatch(api::get_user_info()))
            .then_state(|state| {
                let resource = state.resource(&user()).unwrap();
                assert_eq!(resource.status(), ResourceStatus::Pending);
                assert_eq!(resource.issued(), Seq::new(1));
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_cancellable_future(effects, keys::USER);
            })
            .run();
    }

    #[test]
    fn dispatch_to_unknown_key_is_a_no_op() {
        let state = SyncState::new(ResourceMap::new());
        ReducerTest::new(SyncReducer)
            .with_env(env())
            .given_state(state.clone())
            .when_action(SyncAction::Dispatch(api::get_user_info()))
            .then_state(move |after| assert_eq!(after, &state))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn success_logs_the_member_in() {
        ReducerTest::new(SyncReducer)
            .with_env(env())
            .given_state(SyncState::default())
            .when_action(SyncAction::Dispatch(api::get_user_info()))
            .when_action(SyncAction::Lifecycle {
                key: user(),
                event: Lifecycle::Success {
                    seq: Seq::new(1),
                    payload: member("sloth"),
                    at: at(),
                },
            })
            .then_state(|state| {
                assert!(state.is_logged_in());
                assert_eq!(state.resource(&user()).unwrap().settled_at(), Some(at()));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn retained_member_stays_logged_in_during_refresh() {
        ReducerTest::new(SyncReducer)
            .with_env(env())
            .given_state(SyncState::default())
            .when_action(SyncAction::Dispatch(api::get_user_info()))
            .when_action(SyncAction::Lifecycle {
                key: user(),
                event: Lifecycle::Success {
                    seq: Seq::new(1),
                    payload: member("sloth"),
                    at: at(),
                },
            })
            .when_action(SyncAction::Dispatch(api::get_user_info()))
            .then_state(|state| {
                assert!(state.resource(&user()).unwrap().is_pending());
                assert!(state.is_logged_in());
            })
            .run();
    }

    #[test]
    fn stale_success_is_discarded() {
        ReducerTest::new(SyncReducer)
            .with_env(env())
            .given_state(SyncState::default())
            .when_action(SyncAction::Dispatch(api::get_user_info()))
            .when_action(SyncAction::Dispatch(api::get_user_info()))
            .when_action(SyncAction::Lifecycle {
                key: user(),
                event: Lifecycle::Success {
                    seq: Seq::new(2),
                    payload: member("new"),
                    at: at(),
                },
            })
            .when_action(SyncAction::Lifecycle {
                key: user(),
                event: Lifecycle::Success {
                    seq: Seq::new(1),
                    payload: member("old"),
                    at: at(),
                },
            })
            .then_state(|state| {
                let data = state.resource(&user()).unwrap().data().unwrap();
                assert_eq!(data.as_user().unwrap().nickname, "new");
            })
            .run();
    }

    #[test]
    fn cancel_settles_pending_resource() {
        ReducerTest::new(SyncReducer)
            .with_env(env())
            .given_state(SyncState::default())
            .when_action(SyncAction::Dispatch(api::get_station_list("seoul")))
            .when_action(SyncAction::Cancel {
                key: ResourceKey::new(keys::LOCATION),
            })
            .then_state(|state| {
                let resource = state.resource(&ResourceKey::new(keys::LOCATION)).unwrap();
                assert_eq!(resource.status(), ResourceStatus::Rejected);
                assert_eq!(resource.error().unwrap().kind, ErrorKind::Cancelled);
            })
            .then_effects(|effects| {
                assertions::assert_cancels(effects, keys::LOCATION);
            })
            .run();
    }

    #[test]
    fn cancel_leaves_settled_resource_alone() {
        ReducerTest::new(SyncReducer)
            .with_env(env())
            .given_state(SyncState::default())
            .when_action(SyncAction::Cancel { key: user() })
            .then_state(|state| {
                assert_eq!(state.resource(&user()).unwrap().status(), ResourceStatus::Idle);
            })
            .then_effects(|effects| {
                assertions::assert_cancels(effects, keys::USER);
            })
            .run();
    }
}
