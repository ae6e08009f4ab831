//! The shutdown sequence.
//!
//! [`ShutdownCoordinator::run`] executes the ordered teardown at most once per
//! process:
//!
//! 1. Stop the listener so no new external requests arrive.
//! 2. Stop every active worker in parallel, bounded by
//!    `worker count x per-worker allowance`, then wait a short grace interval
//!    for in-flight acknowledgements.
//! 3. Flush durable log output.
//! 4. Release the single-instance lock.
//! 5. Mark the sequence completed.
//!
//! A failing step is logged and the sequence moves on. Workers that miss the
//! deadline are left running detached; the process exits shortly after.
//!
//! Once claimed, the sequence runs on its own task. A caller that stops
//! waiting for it does not stall teardown.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use futures_util::FutureExt;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use super::state::{ShutdownState, ShutdownStateCell};
use crate::error::Result;
use crate::port::{DurableLogSink, InstanceLock, Listener, Worker, WorkerSet};

/// Timing budget for the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownTimings {
    /// Time granted to each active worker; the total budget scales with count.
    pub worker_stop_allowance: Duration,
    /// Pause after the worker race so in-flight network traffic can land.
    pub post_stop_grace: Duration,
}

impl ShutdownTimings {
    /// Total budget for stopping `workers` workers.
    #[must_use]
    pub fn worker_budget(&self, workers: usize) -> Duration {
        let count = u32::try_from(workers).unwrap_or(u32::MAX);
        self.worker_stop_allowance.saturating_mul(count)
    }
}

impl Default for ShutdownTimings {
    fn default() -> Self {
        Self {
            worker_stop_allowance: Duration::from_secs(5),
            post_stop_grace: Duration::from_secs(1),
        }
    }
}

/// Result of racing all worker stops against the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStopReport {
    pub requested: usize,
    pub stopped: usize,
    pub failed: usize,
    pub abandoned: usize,
}

/// Collaborators the shutdown sequence tears down.
#[derive(Clone)]
pub struct ShutdownCollaborators {
    pub listener: Arc<dyn Listener>,
    pub workers: Arc<dyn WorkerSet>,
    pub log_sink: Arc<dyn DurableLogSink>,
    pub instance: Arc<dyn InstanceLock>,
}

/// Runs the shutdown sequence exactly once.
pub struct ShutdownCoordinator {
    state: ShutdownStateCell,
    collaborators: ShutdownCollaborators,
    timings: ShutdownTimings,
}

impl ShutdownCoordinator {
    #[must_use]
    pub fn new(collaborators: ShutdownCollaborators, timings: ShutdownTimings) -> Self {
        Self {
            state: ShutdownStateCell::new(),
            collaborators,
            timings,
        }
    }

    #[must_use]
    pub fn state(&self) -> ShutdownState {
        self.state.get()
    }

    #[must_use]
    pub fn timings(&self) -> ShutdownTimings {
        self.timings
    }

    fn try_claim(&self) -> bool {
        match self.state.try_begin() {
            Ok(()) => true,
            Err(observed) => {
                debug!(state = observed.as_str(), "Shutdown already claimed");
                false
            }
        }
    }

    /// Run the sequence if nobody else has.
    ///
    /// Returns `true` when this call executed the sequence. Losing callers
    /// return immediately without waiting for the winner.
    pub async fn run(self: &Arc<Self>) -> bool {
        self.run_then(async {}).await
    }

    /// Like [`Self::run`], then run `after` on the same task once the
    /// sequence has completed.
    ///
    /// The sequence and `after` keep running if the returned future is
    /// dropped.
    pub async fn run_then<F>(self: &Arc<Self>, after: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.try_claim() {
            return false;
        }
        let coordinator = Arc::clone(self);
        let sequence = tokio::spawn(async move {
            coordinator.execute_claimed().await;
            after.await;
        });
        if let Err(e) = sequence.await {
            error!(error = %e, "Shutdown task failed");
        }
        true
    }

    async fn execute_claimed(&self) {
        info!("Shutdown sequence started");

        self.stop_listener().await;

        let workers = self.collaborators.workers.active_workers();
        if !workers.is_empty() {
            let budget = self.timings.worker_budget(workers.len());
            let report = stop_workers(workers, true, budget).await;
            info!(
                requested = report.requested,
                stopped = report.stopped,
                failed = report.failed,
                abandoned = report.abandoned,
                "Worker stop race finished"
            );
            tokio::time::sleep(self.timings.post_stop_grace).await;
        }

        if std::panic::catch_unwind(AssertUnwindSafe(|| self.collaborators.log_sink.flush()))
            .is_err()
        {
            error!("Log flush panicked");
        }

        if std::panic::catch_unwind(AssertUnwindSafe(|| self.collaborators.instance.unregister()))
            .is_err()
        {
            error!("Instance lock release panicked");
        }

        if let Err(observed) = self.state.complete() {
            warn!(state = observed.as_str(), "Unexpected state at shutdown completion");
        }
        info!("Shutdown sequence completed");
    }

    async fn stop_listener(&self) {
        let stop = AssertUnwindSafe(self.collaborators.listener.stop()).catch_unwind();
        match stop.await {
            Ok(Ok(())) => debug!("Listener stopped"),
            Ok(Err(e)) => warn!(error = %e, "Listener failed to stop cleanly"),
            Err(_) => error!("Listener stop panicked"),
        }
    }
}

/// Stop all workers concurrently, racing their completion against `budget`.
///
/// Each stop runs on its own task. Tasks still running when the budget
/// expires are detached rather than cancelled.
pub async fn stop_workers(
    workers: Vec<Arc<dyn Worker>>,
    graceful: bool,
    budget: Duration,
) -> WorkerStopReport {
    let requested = workers.len();
    let finished = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = workers
        .into_iter()
        .map(|worker| {
            let finished = Arc::clone(&finished);
            let failed = Arc::clone(&failed);
            tokio::spawn(async move {
                let outcome = worker.stop(graceful).await;
                record_stop(worker.name(), outcome, &failed);
                finished.fetch_add(1, Ordering::AcqRel);
            })
        })
        .collect();

    let all_stopped = join_all(handles);
    match tokio::time::timeout(budget, all_stopped).await {
        Ok(joined) => {
            for result in joined {
                record_join(result, &failed, &finished);
            }
        }
        Err(_) => {
            warn!(
                budget_ms = budget.as_millis() as u64,
                pending = requested.saturating_sub(finished.load(Ordering::Acquire)),
                "Worker stop budget exhausted, abandoning stragglers"
            );
        }
    }

    let failed = failed.load(Ordering::Acquire);
    let finished = finished.load(Ordering::Acquire);
    WorkerStopReport {
        requested,
        stopped: finished.saturating_sub(failed),
        failed,
        abandoned: requested.saturating_sub(finished),
    }
}

fn record_stop(name: &str, outcome: Result<()>, failed: &AtomicUsize) {
    match outcome {
        Ok(()) => debug!(worker = name, "Worker stopped"),
        Err(e) => {
            failed.fetch_add(1, Ordering::AcqRel);
            warn!(worker = name, error = %e, "Worker failed to stop cleanly");
        }
    }
}

// A panicking stop task never reaches its own bookkeeping.
fn record_join(
    result: std::result::Result<(), JoinError>,
    failed: &AtomicUsize,
    finished: &AtomicUsize,
) {
    if let Err(e) = result {
        failed.fetch_add(1, Ordering::AcqRel);
        finished.fetch_add(1, Ordering::AcqRel);
        error!(error = %e, "Worker stop task panicked");
    }
}
