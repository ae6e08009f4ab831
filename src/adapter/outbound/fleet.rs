//! In-memory worker registry.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::debug;

use crate::port::{FleetCount, Worker, WorkerSet};

/// The active worker fleet.
///
/// The current [`FleetCount`] is published on a `watch` channel so the
/// lifecycle hub can react when the fleet drains. Drains are counted here,
/// so a remove followed at once by a register still reads as one drain.
pub struct WorkerRegistry {
    workers: RwLock<Vec<Arc<dyn Worker>>>,
    count: watch::Sender<FleetCount>,
}

impl WorkerRegistry {
    #[must_use]
    pub fn new() -> Self {
        let (count, _) = watch::channel(FleetCount::default());
        Self {
            workers: RwLock::new(Vec::new()),
            count,
        }
    }

    /// Add a worker, replacing any worker with the same name.
    pub fn register(&self, worker: Arc<dyn Worker>) {
        let mut workers = self.workers.write();
        workers.retain(|w| w.name() != worker.name());
        debug!(worker = worker.name(), "Worker registered");
        workers.push(worker);
        self.count.send_modify(|count| *count = count.resized(workers.len()));
    }

    /// Remove a worker by name.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Worker>> {
        let mut workers = self.workers.write();
        let index = workers.iter().position(|w| w.name() == name)?;
        let removed = workers.remove(index);
        debug!(worker = name, "Worker removed");
        self.count.send_modify(|count| *count = count.resized(workers.len()));
        Some(removed)
    }

    #[must_use]
    pub fn subscribe_count(&self) -> watch::Receiver<FleetCount> {
        self.count.subscribe()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerSet for WorkerRegistry {
    fn active_workers(&self) -> Vec<Arc<dyn Worker>> {
        self.workers.read().clone()
    }

    fn active_count(&self) -> usize {
        self.workers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::worker::ScriptedWorker;

    #[test]
    fn test_register_and_remove_track_count() {
        let registry = WorkerRegistry::new();
        let count = registry.subscribe_count();

        registry.register(ScriptedWorker::immediate("a"));
        registry.register(ScriptedWorker::immediate("b"));
        assert_eq!(registry.active_count(), 2);
        assert_eq!(count.borrow().active, 2);

        assert!(registry.remove("a").is_some());
        assert_eq!(count.borrow().active, 1);
        assert_eq!(registry.active_workers()[0].name(), "b");
    }

    #[test]
    fn test_register_same_name_replaces() {
        let registry = WorkerRegistry::new();
        registry.register(ScriptedWorker::immediate("a"));
        registry.register(ScriptedWorker::failing("a"));
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let registry = WorkerRegistry::new();
        assert!(registry.remove("ghost").is_none());
        assert_eq!(*registry.subscribe_count().borrow(), FleetCount::default());
    }

    #[tokio::test]
    async fn test_count_change_is_observed() {
        let registry = WorkerRegistry::new();
        let mut count = registry.subscribe_count();

        registry.register(ScriptedWorker::immediate("a"));
        count.changed().await.unwrap();
        assert_eq!(count.borrow_and_update().active, 1);

        registry.remove("a");
        count.changed().await.unwrap();
        assert_eq!(
            *count.borrow_and_update(),
            FleetCount {
                active: 0,
                drains: 1,
            }
        );
    }

    #[test]
    fn test_quick_refill_still_counts_a_drain() {
        let registry = WorkerRegistry::new();
        let count = registry.subscribe_count();

        registry.register(ScriptedWorker::immediate("a"));
        registry.remove("a");
        registry.register(ScriptedWorker::immediate("b"));

        assert_eq!(
            *count.borrow(),
            FleetCount {
                active: 1,
                drains: 1,
            }
        );
    }

    #[test]
    fn test_replacing_a_worker_is_not_a_drain() {
        let registry = WorkerRegistry::new();
        registry.register(ScriptedWorker::immediate("a"));
        registry.register(ScriptedWorker::failing("a"));
        registry.remove("ghost");
        assert_eq!(registry.subscribe_count().borrow().drains, 0);
    }
}
