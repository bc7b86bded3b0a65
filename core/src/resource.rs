//! Remote resources and the keyed resource map.
//!
//! [`RemoteResource`] is the only entity with real invariants:
//!
//! - `data` and `error` are never both present
//! - `error` is present only when the status is `Rejected`
//! - `data` is present only when the status is `Fulfilled`, or while `Pending`
//!   under [`StalePolicy::RetainData`]
//!
//! Transitions are driven exclusively by [`Lifecycle`] events through
//! [`RemoteResource::apply`]. The transition function is total: an event the
//! seq guard refuses leaves the resource untouched.

use crate::error::RemoteError;
use crate::key::ResourceKey;
use crate::lifecycle::{Lifecycle, Seq};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Where a resource is in its `idle → pending → {fulfilled, rejected}` cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    /// Never dispatched.
    #[default]
    Idle,
    /// A dispatch is in flight.
    Pending,
    /// The last applied call succeeded.
    Fulfilled,
    /// The last applied call failed.
    Rejected,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        };
        write!(f, "{name}")
    }
}

/// What `Start` does with the previous payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Drop the previous payload when a refresh starts.
    #[default]
    Clear,
    /// Keep serving the previous payload while a refresh is pending.
    RetainData,
}

/// How terminal events from overlapping dispatches are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Refuse events whose token is older than the last recorded token.
    #[default]
    SeqGuard,
    /// Apply events in arrival order; a slow, older call can overwrite a newer one.
    LastWriteWins,
}

/// Outcome of routing a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The event transitioned the resource.
    Yes,
    /// The seq guard refused the event.
    Stale,
    /// No resource is registered under the key.
    Unknown,
}

/// A named slot of remote-derived state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResource<T> {
    status: ResourceStatus,
    data: Option<T>,
    error: Option<RemoteError>,
    issued: Seq,
    applied: Seq,
    settled_at: Option<DateTime<Utc>>,
    stale_policy: StalePolicy,
    ordering: OrderingPolicy,
}

impl<T> Default for RemoteResource<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> RemoteResource<T> {
    /// An idle resource with the given policies.
    #[must_use]
    pub const fn new(stale_policy: StalePolicy, ordering: OrderingPolicy) -> Self {
        Self {
            status: ResourceStatus::Idle,
            data: None,
            error: None,
            issued: Seq::ZERO,
            applied: Seq::ZERO,
            settled_at: None,
            stale_policy,
            ordering,
        }
    }

    /// An idle resource with `StalePolicy::Clear` and `OrderingPolicy::SeqGuard`.
    #[must_use]
    pub const fn idle() -> Self {
        Self::new(StalePolicy::Clear, OrderingPolicy::SeqGuard)
    }

    /// Set the staleness policy.
    #[must_use]
    pub const fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    /// Set the ordering policy.
    #[must_use]
    pub const fn with_ordering(mut self, ordering: OrderingPolicy) -> Self {
        self.ordering = ordering;
        self
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> ResourceStatus {
        self.status
    }

    /// Payload, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Error of the last failed call, if the resource is rejected.
    #[must_use]
    pub const fn error(&self) -> Option<&RemoteError> {
        self.error.as_ref()
    }

    /// Latest token handed to a dispatch.
    #[must_use]
    pub const fn issued(&self) -> Seq {
        self.issued
    }

    /// Token of the last applied event.
    #[must_use]
    pub const fn applied(&self) -> Seq {
        self.applied
    }

    /// When the last applied terminal event settled.
    #[must_use]
    pub const fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }

    /// Declared staleness policy.
    #[must_use]
    pub const fn stale_policy(&self) -> StalePolicy {
        self.stale_policy
    }

    /// Declared ordering policy.
    #[must_use]
    pub const fn ordering(&self) -> OrderingPolicy {
        self.ordering
    }

    /// Whether a dispatch is in flight.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, ResourceStatus::Pending)
    }

    /// Hand out the token for a new dispatch.
    pub const fn issue(&mut self) -> Seq {
        self.issued = self.issued.next();
        self.issued
    }

    /// Apply a lifecycle event in place.
    ///
    /// Under [`OrderingPolicy::SeqGuard`], events whose token is older than the
    /// last applied token return [`Applied::Stale`] and change nothing.
    /// Re-applying an event with the current token is accepted and yields the
    /// same state, so duplicate delivery is harmless.
    pub fn apply(&mut self, event: Lifecycle<T>) -> Applied {
        let seq = event.seq();
        if self.ordering == OrderingPolicy::SeqGuard && seq < self.applied {
            return Applied::Stale;
        }

        match event {
            Lifecycle::Start { .. } => {
                self.status = ResourceStatus::Pending;
                self.error = None;
                if self.stale_policy == StalePolicy::Clear {
                    self.data = None;
                }
            }
            Lifecycle::Success { payload, at, .. } => {
                self.status = ResourceStatus::Fulfilled;
                self.data = Some(payload);
                self.error = None;
                self.settled_at = Some(at);
            }
            Lifecycle::Failure { error, at, .. } => {
                self.status = ResourceStatus::Rejected;
                self.data = None;
                self.error = Some(error);
                self.settled_at = Some(at);
            }
        }

        self.applied = self.applied.max(seq);
        self.issued = self.issued.max(seq);
        Applied::Yes
    }
}

impl<T: Clone> RemoteResource<T> {
    /// Pure form of [`apply`](Self::apply): returns the next state.
    #[must_use]
    pub fn reduce(&self, event: Lifecycle<T>) -> Self {
        let mut next = self.clone();
        next.apply(event);
        next
    }
}

/// The keyed container of every resource the client tracks.
///
/// Keys are registered up front with their policies; events addressed to an
/// unregistered key are no-ops.
///
/// # Examples
///
/// ```
/// use meeplo_core::{Applied, Lifecycle, RemoteResource, ResourceKey, ResourceMap, Seq};
///
/// let mut map: ResourceMap<String> = ResourceMap::new()
///     .with_resource("user", RemoteResource::idle());
///
/// let seq = map.begin(&ResourceKey::new("user")).unwrap();
/// assert_eq!(seq, Seq::new(1));
///
/// let stray = map.apply(&ResourceKey::new("nobody"), Lifecycle::Start { seq });
/// assert_eq!(stray, Applied::Unknown);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMap<T> {
    resources: HashMap<ResourceKey, RemoteResource<T>>,
}

impl<T> Default for ResourceMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResourceMap<T> {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resources: HashMap::new(),
        }
    }

    /// Register a resource under `key`, replacing any previous registration.
    #[must_use]
    pub fn with_resource(mut self, key: impl Into<ResourceKey>, resource: RemoteResource<T>) -> Self {
        self.register(key, resource);
        self
    }

    /// Register a resource under `key`, replacing any previous registration.
    pub fn register(&mut self, key: impl Into<ResourceKey>, resource: RemoteResource<T>) {
        self.resources.insert(key.into(), resource);
    }

    /// Look up a resource.
    #[must_use]
    pub fn get(&self, key: &ResourceKey) -> Option<&RemoteResource<T>> {
        self.resources.get(key)
    }

    /// Whether `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.resources.contains_key(key)
    }

    /// Registered keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.resources.keys()
    }

    /// Number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resource is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Issue a token for `key` and apply its `Start` event.
    ///
    /// Returns `None` for unregistered keys.
    pub fn begin(&mut self, key: &ResourceKey) -> Option<Seq> {
        let resource = self.resources.get_mut(key)?;
        let seq = resource.issue();
        resource.apply(Lifecycle::Start { seq });
        Some(seq)
    }

    /// Settle a pending resource as failed with `error` under a fresh token.
    ///
    /// The fresh token makes any late event of the abandoned dispatch stale
    /// under [`OrderingPolicy::SeqGuard`]. Returns `None` when `key` is not
    /// registered or not pending.
    pub fn abandon(&mut self, key: &ResourceKey, error: RemoteError, at: DateTime<Utc>) -> Option<Seq> {
        let resource = self.resources.get_mut(key)?;
        if !resource.is_pending() {
            return None;
        }
        let seq = resource.issue();
        resource.apply(Lifecycle::Failure { seq, error, at });
        Some(seq)
    }

    /// Route a lifecycle event to its resource.
    pub fn apply(&mut self, key: &ResourceKey, event: Lifecycle<T>) -> Applied {
        match self.resources.get_mut(key) {
            Some(resource) => resource.apply(event),
            None => Applied::Unknown,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::error::{ErrorKind, RemoteError};

    #[derive(Debug, Clone, PartialEq)]
    struct ScheduleRef {
        id: u32,
    }

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_735_689_600, 0).unwrap()
    }

    fn success(seq: u64, id: u32) -> Lifecycle<ScheduleRef> {
        Lifecycle::Success {
            seq: Seq::new(seq),
            payload: ScheduleRef { id },
            at: at(),
        }
    }

    #[test]
    fn start_moves_idle_to_pending() {
        let mut schedule = RemoteResource::<ScheduleRef>::idle();
        let seq = schedule.issue();
        assert_eq!(schedule.apply(Lifecycle::Start { seq }), Applied::Yes);
        assert_eq!(schedule.status(), ResourceStatus::Pending);
        assert!(schedule.data().is_none());
        assert!(schedule.error().is_none());
    }

    #[test]
    fn start_after_rejection_clears_error() {
        let mut schedule = RemoteResource::<ScheduleRef>::idle();
        let first = schedule.issue();
        schedule.apply(Lifecycle::Start { seq: first });
        schedule.apply(Lifecycle::Failure {
            seq: first,
            error: RemoteError::new(ErrorKind::Network, "NETWORK", "unreachable"),
            at: at(),
        });
        assert_eq!(schedule.status(), ResourceStatus::Rejected);
        assert_eq!(schedule.error().unwrap().code, "NETWORK");

        let second = schedule.issue();
        schedule.apply(Lifecycle::Start { seq: second });
        assert_eq!(schedule.status(), ResourceStatus::Pending);
        assert!(schedule.error().is_none());
        assert!(schedule.data().is_none());
    }

    #[test]
    fn retain_policy_serves_stale_data_while_pending() {
        let mut user = RemoteResource::idle().with_stale_policy(StalePolicy::RetainData);
        let first = user.issue();
        user.apply(Lifecycle::Start { seq: first });
        user.apply(success(first.get(), 1));

        let second = user.issue();
        user.apply(Lifecycle::Start { seq: second });
        assert!(user.is_pending());
        assert_eq!(user.data(), Some(&ScheduleRef { id: 1 }));
    }

    #[test]
    fn clear_policy_drops_data_on_refresh() {
        let mut location = RemoteResource::idle();
        let first = location.issue();
        location.apply(Lifecycle::Start { seq: first });
        location.apply(success(first.get(), 1));

        let second = location.issue();
        location.apply(Lifecycle::Start { seq: second });
        assert!(location.data().is_none());
    }

    #[test]
    fn failure_drops_data() {
        let mut schedule = RemoteResource::idle();
        let seq = schedule.issue();
        schedule.apply(Lifecycle::Start { seq });
        schedule.apply(success(1, 9));
        schedule.apply(Lifecycle::Failure {
            seq,
            error: RemoteError::parse("expected object"),
            at: at(),
        });
        assert!(schedule.data().is_none());
        assert_eq!(schedule.error().unwrap().kind, ErrorKind::Parse);
        assert_eq!(schedule.settled_at(), Some(at()));
    }

    #[test]
    fn duplicate_failure_is_idempotent() {
        let mut schedule = RemoteResource::<ScheduleRef>::idle();
        let seq = schedule.issue();
        schedule.apply(Lifecycle::Start { seq });
        let failure = Lifecycle::Failure {
            seq,
            error: RemoteError::timeout(std::time::Duration::from_secs(10)),
            at: at(),
        };

        let once = schedule.reduce(failure.clone());
        let twice = once.reduce(failure);
        assert_eq!(once, twice);
        assert_eq!(twice.status(), ResourceStatus::Rejected);
        assert_eq!(twice.error().unwrap().kind, ErrorKind::Timeout);
    }

    #[test]
    fn seq_guard_keeps_newer_result() {
        let mut schedule = RemoteResource::idle();
        let a = schedule.issue();
        schedule.apply(Lifecycle::Start { seq: a });
        let b = schedule.issue();
        schedule.apply(Lifecycle::Start { seq: b });

        assert_eq!(schedule.apply(success(b.get(), 5)), Applied::Yes);
        assert_eq!(schedule.apply(success(a.get(), 3)), Applied::Stale);
        assert_eq!(schedule.data(), Some(&ScheduleRef { id: 5 }));
        assert_eq!(schedule.applied(), b);
    }

    #[test]
    fn seq_guard_rejects_older_result_while_newer_is_pending() {
        let mut schedule = RemoteResource::idle();
        let a = schedule.issue();
        schedule.apply(Lifecycle::Start { seq: a });
        let b = schedule.issue();
        schedule.apply(Lifecycle::Start { seq: b });

        assert_eq!(schedule.apply(success(a.get(), 3)), Applied::Stale);
        assert!(schedule.is_pending());
    }

    #[test]
    fn last_write_wins_lets_slow_response_overwrite() {
        let mut schedule = RemoteResource::idle().with_ordering(OrderingPolicy::LastWriteWins);
        let a = schedule.issue();
        schedule.apply(Lifecycle::Start { seq: a });
        let b = schedule.issue();
        schedule.apply(Lifecycle::Start { seq: b });

        schedule.apply(success(b.get(), 5));
        assert_eq!(schedule.apply(success(a.get(), 3)), Applied::Yes);
        assert_eq!(schedule.data(), Some(&ScheduleRef { id: 3 }));
        assert_eq!(schedule.applied(), b);
    }

    #[test]
    fn map_routes_by_key() {
        let mut map = ResourceMap::new()
            .with_resource("schedule", RemoteResource::idle())
            .with_resource("group", RemoteResource::idle());
        let key = ResourceKey::new("schedule");

        let seq = map.begin(&key).unwrap();
        map.apply(&key, success(seq.get(), 1));

        assert_eq!(map.get(&key).unwrap().status(), ResourceStatus::Fulfilled);
        assert_eq!(
            map.get(&ResourceKey::new("group")).unwrap().status(),
            ResourceStatus::Idle
        );
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn map_ignores_unknown_keys() {
        let mut map: ResourceMap<ScheduleRef> = ResourceMap::new();
        let before = map.clone();
        let key = ResourceKey::new("moments");
        assert!(map.begin(&key).is_none());
        assert_eq!(map.apply(&key, success(1, 1)), Applied::Unknown);
        assert_eq!(map, before);
    }

    #[test]
    fn abandon_makes_late_result_stale() {
        let mut map = ResourceMap::new().with_resource("schedule", RemoteResource::idle());
        let key = ResourceKey::new("schedule");

        let seq = map.begin(&key).unwrap();
        let cancelled = map.abandon(&key, RemoteError::cancelled(), at()).unwrap();
        assert!(cancelled > seq);

        let resource = map.get(&key).unwrap();
        assert_eq!(resource.status(), ResourceStatus::Rejected);
        assert_eq!(resource.error().unwrap().kind, ErrorKind::Cancelled);

        assert_eq!(map.apply(&key, success(seq.get(), 9)), Applied::Stale);
        assert!(map.abandon(&key, RemoteError::cancelled(), at()).is_none());
    }
}
