//! Property tests for the resource transition function.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::{DateTime, Utc};
use meeplo_core::{
    ErrorKind, Lifecycle, OrderingPolicy, RemoteError, RemoteResource, ResourceStatus, Seq,
    StalePolicy,
};
use proptest::prelude::*;

fn at(offset: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_735_689_600 + offset, 0).unwrap()
}

fn event_strategy() -> impl Strategy<Value = Lifecycle<u8>> {
    let seq = (0u64..6).prop_map(Seq::new);
    prop_oneof![
        seq.clone().prop_map(|seq| Lifecycle::Start { seq }),
        (seq.clone(), any::<u8>(), 0i64..100).prop_map(|(seq, payload, t)| Lifecycle::Success {
            seq,
            payload,
            at: at(t),
        }),
        (seq, prop_oneof![Just("NETWORK"), Just("TIMEOUT"), Just("HTTP_500")], 0i64..100)
            .prop_map(|(seq, code, t)| Lifecycle::Failure {
                seq,
                error: RemoteError::new(ErrorKind::Network, code, "boom"),
                at: at(t),
            }),
    ]
}

fn resource_strategy() -> impl Strategy<Value = RemoteResource<u8>> {
    (
        prop_oneof![Just(StalePolicy::Clear), Just(StalePolicy::RetainData)],
        prop_oneof![Just(OrderingPolicy::SeqGuard), Just(OrderingPolicy::LastWriteWins)],
    )
        .prop_map(|(stale, ordering)| RemoteResource::new(stale, ordering))
}

fn assert_invariants(resource: &RemoteResource<u8>) {
    assert!(
        !(resource.data().is_some() && resource.error().is_some()),
        "data and error coexist: {resource:?}"
    );
    assert_eq!(
        resource.error().is_some(),
        resource.status() == ResourceStatus::Rejected,
        "error present outside rejected: {resource:?}"
    );
    if resource.data().is_some() {
        let fulfilled = resource.status() == ResourceStatus::Fulfilled;
        let stale_pending = resource.status() == ResourceStatus::Pending
            && resource.stale_policy() == StalePolicy::RetainData;
        assert!(fulfilled || stale_pending, "data present while {resource:?}");
    }
}

proptest! {
    #[test]
    fn data_and_error_never_coexist(
        initial in resource_strategy(),
        events in prop::collection::vec(event_strategy(), 0..40),
    ) {
        let mut resource = initial;
        assert_invariants(&resource);
        for event in events {
            resource.apply(event);
            assert_invariants(&resource);
        }
    }

    #[test]
    fn reduce_is_deterministic(
        initial in resource_strategy(),
        history in prop::collection::vec(event_strategy(), 0..20),
        event in event_strategy(),
    ) {
        let mut state = initial;
        for e in history {
            state.apply(e);
        }
        prop_assert_eq!(state.reduce(event.clone()), state.reduce(event));
    }

    #[test]
    fn seq_guard_never_moves_backwards(
        events in prop::collection::vec(event_strategy(), 0..40),
    ) {
        let mut resource = RemoteResource::<u8>::idle();
        let mut last = resource.applied();
        for event in events {
            resource.apply(event);
            prop_assert!(resource.applied() >= last);
            last = resource.applied();
        }
    }

    #[test]
    fn duplicate_terminal_delivery_is_idempotent(
        initial in resource_strategy(),
        history in prop::collection::vec(event_strategy(), 0..20),
        event in event_strategy().prop_filter("terminal only", Lifecycle::is_terminal),
    ) {
        let mut state = initial;
        for e in history {
            state.apply(e);
        }
        let once = state.reduce(event.clone());
        let twice = once.reduce(event);
        prop_assert_eq!(once, twice);
    }
}
