//! Worker doubles with scripted stop behavior.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::port::{Worker, WorkerSet};

#[derive(Debug, Clone, Copy)]
enum StopScript {
    Immediate,
    After(Duration),
    Never,
    Fail,
    Panic,
}

/// A worker whose `stop` follows a fixed script.
#[derive(Debug)]
pub struct ScriptedWorker {
    name: String,
    script: StopScript,
    requested: AtomicBool,
    stopped: AtomicBool,
    graceful: Mutex<Option<bool>>,
}

impl ScriptedWorker {
    fn scripted(name: &str, script: StopScript) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script,
            requested: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            graceful: Mutex::new(None),
        })
    }

    /// Stops as soon as asked.
    pub fn immediate(name: &str) -> Arc<Self> {
        Self::scripted(name, StopScript::Immediate)
    }

    /// Stops after `delay` (tokio time, so pausable).
    pub fn after(name: &str, delay: Duration) -> Arc<Self> {
        Self::scripted(name, StopScript::After(delay))
    }

    /// Never finishes stopping.
    pub fn never(name: &str) -> Arc<Self> {
        Self::scripted(name, StopScript::Never)
    }

    /// Returns an error from `stop`.
    pub fn failing(name: &str) -> Arc<Self> {
        Self::scripted(name, StopScript::Fail)
    }

    /// Panics inside `stop`.
    pub fn panicking(name: &str) -> Arc<Self> {
        Self::scripted(name, StopScript::Panic)
    }

    /// `stop` was called.
    pub fn stop_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// `stop` ran to successful completion.
    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// The `graceful` flag of the last stop request.
    pub fn graceful(&self) -> Option<bool> {
        *self.graceful.lock()
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stop(&self, graceful: bool) -> Result<()> {
        self.requested.store(true, Ordering::Release);
        *self.graceful.lock() = Some(graceful);

        match self.script {
            StopScript::Immediate => {}
            StopScript::After(delay) => tokio::time::sleep(delay).await,
            StopScript::Never => std::future::pending::<()>().await,
            StopScript::Fail => {
                return Err(Error::Worker {
                    name: self.name.clone(),
                    reason: "scripted failure".to_string(),
                })
            }
            StopScript::Panic => panic!("scripted panic in worker {}", self.name),
        }

        self.stopped.store(true, Ordering::Release);
        Ok(())
    }
}

/// A worker set that always reports the same workers.
pub struct StaticWorkerSet {
    workers: Vec<Arc<dyn Worker>>,
}

impl StaticWorkerSet {
    pub fn new(workers: Vec<Arc<dyn Worker>>) -> Self {
        Self { workers }
    }
}

impl WorkerSet for StaticWorkerSet {
    fn active_workers(&self) -> Vec<Arc<dyn Worker>> {
        self.workers.clone()
    }
}
