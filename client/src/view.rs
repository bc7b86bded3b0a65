//! Resource views: read snapshots, dispatch, and cancel on drop.

use crate::action::AsyncAction;
use crate::model::Payload;
use crate::reducer::{SyncAction, SyncEnvironment, SyncReducer, SyncState};
use meeplo_core::effect::EffectId;
use meeplo_core::key::ResourceKey;
use meeplo_core::resource::{RemoteResource, ResourceStatus};
use meeplo_runtime::{EffectHandle, Store, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::watch;

/// The store every view reads from.
pub type SyncStore = Store<SyncState, SyncAction, SyncEnvironment, SyncReducer>;

/// What a screen renders for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewMode {
    /// Nothing requested yet
    Idle,
    /// A call is in flight
    Loading,
    /// The last call succeeded
    Content,
    /// The last call failed
    Error,
}

impl From<ResourceStatus> for ViewMode {
    fn from(status: ResourceStatus) -> Self {
        match status {
            ResourceStatus::Idle => Self::Idle,
            ResourceStatus::Pending => Self::Loading,
            ResourceStatus::Fulfilled => Self::Content,
            ResourceStatus::Rejected => Self::Error,
        }
    }
}

/// View failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    /// The store refused the action
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No resource is registered under the key
    #[error("resource {0} is not registered")]
    UnknownResource(ResourceKey),

    /// The action feeds a different resource than the view watches
    #[error("action {action} feeds {target}, not {watched}")]
    ForeignAction {
        /// Operation name
        action: &'static str,
        /// Resource the action feeds
        target: ResourceKey,
        /// Resource the view watches
        watched: ResourceKey,
    },
}

/// A screen's handle on one resource.
///
/// Dispatch returns as soon as the resource is pending; await
/// [`changed`](Self::changed) or [`settled`](Self::settled) for the outcome.
/// Dropping a view that dispatched cancels its in-flight calls and settles a
/// still-pending resource as cancelled.
pub struct ResourceView {
    store: SyncStore,
    key: ResourceKey,
    changes: watch::Receiver<u64>,
    dispatched: AtomicBool,
}

impl ResourceView {
    /// Open a view on `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::UnknownResource`] when `key` is not registered.
    pub async fn open(store: SyncStore, key: impl Into<ResourceKey>) -> Result<Self, ViewError> {
        let key = key.into();
        if !store.state(|s| s.resources().contains(&key)).await {
            return Err(ViewError::UnknownResource(key));
        }
        let changes = store.subscribe_changes();
        Ok(Self {
            store,
            key,
            changes,
            dispatched: AtomicBool::new(false),
        })
    }

    /// Watched resource key.
    #[must_use]
    pub const fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Clone of the current resource.
    pub async fn snapshot(&self) -> RemoteResource<Payload> {
        self.store
            .state(|s| s.resource(&self.key).cloned())
            .await
            .unwrap_or_default()
    }

    /// Current render mode.
    pub async fn mode(&self) -> ViewMode {
        self.store
            .state(|s| s.resource(&self.key).map(RemoteResource::status))
            .await
            .unwrap_or_default()
            .into()
    }

    /// Dispatch `action`, which must feed this view's resource.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::ForeignAction`] for an action bound to another
    /// key, and [`ViewError::Store`] when the store is shutting down.
    pub async fn dispatch(&self, action: AsyncAction) -> Result<EffectHandle, ViewError> {
        if action.key != self.key {
            return Err(ViewError::ForeignAction {
                action: action.name,
                target: action.key,
                watched: self.key.clone(),
            });
        }
        self.dispatched.store(true, Ordering::Release);
        Ok(self.store.send(SyncAction::Dispatch(action)).await?)
    }

    /// Abandon this resource's in-flight calls.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Store`] when the store is shutting down.
    pub async fn cancel(&self) -> Result<(), ViewError> {
        self.store
            .send(SyncAction::Cancel { key: self.key.clone() })
            .await?;
        Ok(())
    }

    /// Wait for the store's next change.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] when the store is gone.
    pub async fn changed(&mut self) -> Result<(), ViewError> {
        self.changes
            .changed()
            .await
            .map_err(|_| ViewError::Store(StoreError::ChannelClosed))
    }

    /// Wait until the resource is no longer pending and return it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] when the store is gone.
    pub async fn settled(&mut self) -> Result<RemoteResource<Payload>, ViewError> {
        loop {
            self.changes.mark_unchanged();
            let snapshot = self.snapshot().await;
            if !snapshot.is_pending() {
                return Ok(snapshot);
            }
            self.changed().await?;
        }
    }
}

impl Drop for ResourceView {
    fn drop(&mut self) {
        if !self.dispatched.load(Ordering::Acquire) {
            return;
        }
        let id = EffectId::from(&self.key);
        if self.store.in_flight(&id) == 0 {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let store = self.store.clone();
                let key = self.key.clone();
                runtime.spawn(async move {
                    if let Err(error) = store.send(SyncAction::Cancel { key }).await {
                        tracing::debug!(error = %error, "View cancellation dropped");
                    }
                });
            },
            Err(_) => {
                self.store.cancel(&id);
            },
        }
    }
}
