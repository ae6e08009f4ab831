//! Worker fleet port.
//!
//! A worker is a stateful network session owned by the fleet. The lifecycle
//! core never looks inside one; it only asks it to stop.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// A single long-lived worker.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    /// Stop the worker.
    ///
    /// With `graceful` set the worker should disconnect cleanly. The call may
    /// take arbitrarily long or never complete; callers bound it themselves.
    async fn stop(&self, graceful: bool) -> Result<()>;
}

/// The set of workers currently active in the process.
pub trait WorkerSet: Send + Sync {
    /// Snapshot of the active workers.
    fn active_workers(&self) -> Vec<Arc<dyn Worker>>;

    /// Number of active workers.
    fn active_count(&self) -> usize {
        self.active_workers().len()
    }
}

/// Membership snapshot published by a worker set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetCount {
    pub active: usize,
    /// Times the set has gone from non-empty to empty. Counted at the source
    /// so a watcher that misses a short-lived empty state still sees it.
    pub drains: u64,
}

impl FleetCount {
    /// The snapshot after the set size changes to `active`.
    #[must_use]
    pub fn resized(self, active: usize) -> Self {
        let drained = self.active > 0 && active == 0;
        Self {
            active,
            drains: self.drains + u64::from(drained),
        }
    }
}
