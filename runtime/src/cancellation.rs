//! Registry of cancellable in-flight effects.
//!
//! Each `Effect::Cancellable` spawns its task through the registry, which keeps
//! the task's `AbortHandle` under the effect id until the task finishes or is
//! aborted.

use meeplo_core::effect::EffectId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::AbortHandle;

type Tasks = HashMap<EffectId, HashMap<u64, AbortHandle>>;

/// Abort handles of running tasks, grouped by effect id.
#[derive(Default)]
pub(crate) struct CancellationRegistry {
    next_ticket: AtomicU64,
    tasks: Mutex<Tasks>,
}

impl CancellationRegistry {
    // A panicking task cannot leave the map half-updated, so poison is ignored.
    fn lock(&self) -> MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `task` registered under `id`.
    ///
    /// The lock is held across the spawn so the task's own deregistration
    /// cannot run before its handle is recorded.
    pub(crate) fn spawn<F>(self: &Arc<Self>, id: EffectId, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let registration = Registration {
            registry: Arc::clone(self),
            id: id.clone(),
            ticket,
        };

        let mut tasks = self.lock();
        let handle = tokio::spawn(async move {
            let _registration = registration;
            task.await;
        });
        tasks.entry(id).or_default().insert(ticket, handle.abort_handle());
    }

    /// Abort every task registered under `id`. Returns how many were aborted.
    pub(crate) fn cancel(&self, id: &EffectId) -> usize {
        let handles = self.lock().remove(id).unwrap_or_default();
        // Abort outside the lock: dropping an aborted task deregisters it.
        for handle in handles.values() {
            handle.abort();
        }
        handles.len()
    }

    /// Abort every registered task.
    pub(crate) fn cancel_all(&self) -> usize {
        let all = std::mem::take(&mut *self.lock());
        let mut aborted = 0;
        for handles in all.values() {
            for handle in handles.values() {
                handle.abort();
                aborted += 1;
            }
        }
        aborted
    }

    /// Number of running tasks registered under `id`.
    pub(crate) fn in_flight(&self, id: &EffectId) -> usize {
        self.lock().get(id).map_or(0, HashMap::len)
    }

    fn deregister(&self, id: &EffectId, ticket: u64) {
        let mut tasks = self.lock();
        if let Some(handles) = tasks.get_mut(id) {
            handles.remove(&ticket);
            if handles.is_empty() {
                tasks.remove(id);
            }
        }
    }
}

/// Removes its task from the registry when the task completes or is dropped.
struct Registration {
    registry: Arc<CancellationRegistry>,
    id: EffectId,
    ticket: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.deregister(&self.id, self.ticket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn finished_tasks_deregister() {
        let registry = Arc::new(CancellationRegistry::default());
        let id = EffectId::new("schedule");
        let (tx, rx) = oneshot::channel();

        registry.spawn(id.clone(), async move {
            let _ = tx.send(());
        });
        let _ = rx.await;

        for _ in 0..50 {
            if registry.in_flight(&id) == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.in_flight(&id), 0);
    }

    #[tokio::test]
    async fn cancel_aborts_only_matching_id() {
        let registry = Arc::new(CancellationRegistry::default());
        let user = EffectId::new("user");
        let group = EffectId::new("group");

        registry.spawn(user.clone(), tokio::time::sleep(Duration::from_secs(60)));
        registry.spawn(user.clone(), tokio::time::sleep(Duration::from_secs(60)));
        registry.spawn(group.clone(), tokio::time::sleep(Duration::from_secs(60)));

        assert_eq!(registry.in_flight(&user), 2);
        assert_eq!(registry.cancel(&user), 2);
        assert_eq!(registry.in_flight(&user), 0);
        assert_eq!(registry.in_flight(&group), 1);
        assert_eq!(registry.cancel_all(), 1);
    }
}
