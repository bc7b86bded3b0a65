//! Store-level tests: overlapping dispatches, failures and view cancellation.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use meeplo_client::api::{self, keys};
use meeplo_client::{AsyncAction, Payload, ResourceView, SyncAction, SyncEnvironment, SyncReducer, SyncState, SyncStore};
use meeplo_core::effect::EffectId;
use meeplo_core::error::{ErrorKind, RemoteError};
use meeplo_core::key::ResourceKey;
use meeplo_core::resource::{OrderingPolicy, RemoteResource, ResourceMap, ResourceStatus};
use meeplo_core::transport::{Method, Request};
use meeplo_testing::{MockTransport, test_clock};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn store_with(state: SyncState, transport: &Arc<MockTransport>) -> SyncStore {
    let env = SyncEnvironment::new(Arc::clone(transport) as _, Arc::new(test_clock()));
    SyncStore::new(state, SyncReducer, env)
}

fn schedule_state(ordering: OrderingPolicy) -> SyncState {
    SyncState::new(
        ResourceMap::new().with_resource(keys::SCHEDULE, RemoteResource::idle().with_ordering(ordering)),
    )
}

fn schedule(id: u64) -> serde_json::Value {
    json!({ "id": id, "name": format!("meetup {id}"), "date": "2025-06-01 18:00" })
}

async fn schedule_id(store: &SyncStore) -> Option<u64> {
    store
        .state(|s| {
            s.resource(&ResourceKey::new(keys::SCHEDULE))
                .and_then(RemoteResource::data)
                .and_then(Payload::as_schedule)
                .map(|schedule| schedule.id)
        })
        .await
}

/// A (seq 1) and B (seq 2) overlap; B settles first, then A.
async fn race(ordering: OrderingPolicy) -> Option<u64> {
    let transport = Arc::new(MockTransport::new());
    let gate_a = transport.gate(Method::Get, "/schedule/3");
    let gate_b = transport.gate(Method::Get, "/schedule/5");
    let store = store_with(schedule_state(ordering), &transport);

    let mut a = store.send(SyncAction::Dispatch(api::get_schedule(3))).await.unwrap();
    let mut b = store.send(SyncAction::Dispatch(api::get_schedule(5))).await.unwrap();

    gate_b.release_json(schedule(5));
    b.wait_with_timeout(Duration::from_secs(5)).await.unwrap();
    assert_eq!(schedule_id(&store).await, Some(5));

    gate_a.release_json(schedule(3));
    a.wait_with_timeout(Duration::from_secs(5)).await.unwrap();

    schedule_id(&store).await
}

#[tokio::test]
async fn seq_guard_keeps_the_latest_dispatch() {
    assert_eq!(race(OrderingPolicy::SeqGuard).await, Some(5));
}

#[tokio::test]
async fn last_write_wins_keeps_the_latest_arrival() {
    assert_eq!(race(OrderingPolicy::LastWriteWins).await, Some(3));
}

#[tokio::test]
async fn redispatch_after_failure_clears_the_error() {
    let transport = Arc::new(MockTransport::new());
    transport.fail(Method::Get, "/group", RemoteError::network("connection reset"));
    let gate = transport.gate(Method::Get, "/group");
    let store = store_with(SyncState::default(), &transport);
    let key = ResourceKey::new(keys::GROUP_LIST);

    let mut first = store.send(SyncAction::Dispatch(api::get_group_list())).await.unwrap();
    first.wait().await;
    let rejected = store.state(|s| s.resource(&key).cloned()).await.unwrap();
    assert_eq!(rejected.status(), ResourceStatus::Rejected);
    assert_eq!(rejected.error().unwrap().code, "NETWORK");

    let mut second = store.send(SyncAction::Dispatch(api::get_group_list())).await.unwrap();
    let pending = store.state(|s| s.resource(&key).cloned()).await.unwrap();
    assert_eq!(pending.status(), ResourceStatus::Pending);
    assert!(pending.error().is_none());

    gate.release_json(json!([{ "id": 1, "name": "sloths", "memberCount": 4 }]));
    second.wait().await;
    let fulfilled = store.state(|s| s.resource(&key).cloned()).await.unwrap();
    assert_eq!(fulfilled.status(), ResourceStatus::Fulfilled);
}

#[tokio::test]
async fn malformed_body_rejects_the_resource() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_raw(Method::Get, "/location/station", "{\"stations\":");
    let store = store_with(SyncState::default(), &transport);

    let mut handle = store
        .send(SyncAction::Dispatch(api::get_station_list("hongdae")))
        .await
        .unwrap();
    handle.wait().await;

    let error = store
        .state(|s| s.resource(&ResourceKey::new(keys::LOCATION)).and_then(|r| r.error().cloned()))
        .await
        .unwrap();
    assert_eq!(error.kind, ErrorKind::Parse);
}

fn exploding_decoder(_body: &[u8]) -> Result<Payload, serde_json::Error> {
    panic!("decoder exploded")
}

#[tokio::test]
async fn decoder_panic_rejects_the_resource() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(Method::Get, "/member", json!({ "id": 1, "nickname": "sloth" }));
    let store = store_with(SyncState::default(), &transport);
    let action = AsyncAction::new(keys::USER, "get_user_info", Request::get("/member"), exploding_decoder);

    let mut handle = store.send(SyncAction::Dispatch(action)).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(5)).await.unwrap();

    let user = store.state(|s| s.resource(&ResourceKey::new(keys::USER)).cloned()).await.unwrap();
    assert_eq!(user.status(), ResourceStatus::Rejected);
    assert_eq!(user.error().unwrap().code, "PANIC");
}

#[tokio::test]
async fn dropping_a_view_cancels_its_call() {
    let transport = Arc::new(MockTransport::new());
    let gate = transport.gate(Method::Get, "/group/1");
    let store = store_with(SyncState::default(), &transport);
    let id = EffectId::from(keys::GROUP);
    let mut changes = store.subscribe_changes();

    let view = ResourceView::open(store.clone(), keys::GROUP).await.unwrap();
    view.dispatch(api::get_group(1)).await.unwrap();
    assert_eq!(store.in_flight(&id), 1);
    drop(view);

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let status = store
                .state(|s| s.resource(&ResourceKey::new(keys::GROUP)).map(RemoteResource::status))
                .await;
            if status == Some(ResourceStatus::Rejected) {
                break;
            }
            changes.changed().await.unwrap();
        }
    })
    .await
    .expect("view drop should settle the resource");

    let error = store
        .state(|s| s.resource(&ResourceKey::new(keys::GROUP)).and_then(|r| r.error().cloned()))
        .await
        .unwrap();
    assert_eq!(error.kind, ErrorKind::Cancelled);
    assert_eq!(store.in_flight(&id), 0);

    // The abandoned call has nowhere to deliver.
    gate.release_json(json!({ "id": 1, "name": "sloths" }));
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_calls() {
    let transport = Arc::new(MockTransport::new());
    let gate = transport.gate(Method::Get, "/member");
    let store = store_with(SyncState::default(), &transport);

    store.send(SyncAction::Dispatch(api::get_user_info())).await.unwrap();
    let releaser = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.release_json(json!({ "id": 9, "nickname": "late" }));
    });

    store.shutdown(Duration::from_secs(5)).await.unwrap();
    releaser.await.unwrap();

    let user = store.state(|s| s.resource(&ResourceKey::new(keys::USER)).cloned()).await.unwrap();
    assert_eq!(user.status(), ResourceStatus::Fulfilled);
    assert_eq!(user.data().and_then(Payload::as_user).unwrap().nickname, "late");
    assert!(store.send(SyncAction::Dispatch(api::get_user_info())).await.is_err());
}
