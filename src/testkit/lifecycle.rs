//! Recording doubles for the ports the shutdown sequence drives.
//!
//! Each double counts calls and remembers when the last one happened so
//! tests can assert both "exactly once" and ordering.

use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::port::{DurableLogSink, InstanceLock, Listener, Relauncher, TaskSupervisor};

// ---------------------------------------------------------------------------
// RecordingListener
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum ListenerScript {
    Clean,
    Fail,
    Panic,
}

pub struct RecordingListener {
    script: ListenerScript,
    stops: AtomicUsize,
    stopped_at: Mutex<Option<Instant>>,
}

impl RecordingListener {
    fn scripted(script: ListenerScript) -> Self {
        Self {
            script,
            stops: AtomicUsize::new(0),
            stopped_at: Mutex::new(None),
        }
    }

    pub fn new() -> Self {
        Self::scripted(ListenerScript::Clean)
    }

    pub fn failing() -> Self {
        Self::scripted(ListenerScript::Fail)
    }

    pub fn panicking() -> Self {
        Self::scripted(ListenerScript::Panic)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::Acquire)
    }

    pub fn stopped_at(&self) -> Option<Instant> {
        *self.stopped_at.lock()
    }
}

impl Default for RecordingListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for RecordingListener {
    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::AcqRel);
        *self.stopped_at.lock() = Some(Instant::now());
        match self.script {
            ListenerScript::Clean => Ok(()),
            ListenerScript::Fail => Err(Error::Listener("scripted failure".to_string())),
            ListenerScript::Panic => panic!("scripted listener panic"),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingLogSink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingLogSink {
    flushes: AtomicUsize,
    flushed_at: Mutex<Option<Instant>>,
}

impl RecordingLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::Acquire)
    }

    pub fn flushed_at(&self) -> Option<Instant> {
        *self.flushed_at.lock()
    }
}

impl DurableLogSink for RecordingLogSink {
    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::AcqRel);
        *self.flushed_at.lock() = Some(Instant::now());
    }
}

// ---------------------------------------------------------------------------
// RecordingInstanceLock
// ---------------------------------------------------------------------------

/// In-memory instance lock. Only the holder's release is counted.
#[derive(Default)]
pub struct RecordingInstanceLock {
    held: AtomicBool,
    releases: AtomicUsize,
    released_at: Mutex<Option<Instant>>,
}

impl RecordingInstanceLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A lock that is already registered.
    pub fn held() -> Self {
        let lock = Self::new();
        lock.held.store(true, Ordering::Release);
        lock
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Acquire)
    }

    pub fn released_at(&self) -> Option<Instant> {
        *self.released_at.lock()
    }
}

impl InstanceLock for RecordingInstanceLock {
    fn register(&self) -> bool {
        !self.held.swap(true, Ordering::AcqRel)
    }

    fn unregister(&self) {
        if self.held.swap(false, Ordering::AcqRel) {
            self.releases.fetch_add(1, Ordering::AcqRel);
            *self.released_at.lock() = Some(Instant::now());
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingRelauncher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingRelauncher {
    launches: AtomicUsize,
    fail_next: AtomicBool,
}

impl RecordingRelauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `relaunch` call fail.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::Release);
    }

    /// Successful relaunches so far.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::Acquire)
    }
}

impl Relauncher for RecordingRelauncher {
    fn relaunch(&self) -> Result<()> {
        if self.fail_next.swap(false, Ordering::AcqRel) {
            return Err(Error::Io(io::Error::other("scripted relaunch failure")));
        }
        self.launches.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingSupervisor
// ---------------------------------------------------------------------------

/// Spawns tasks directly and records their names and faults.
#[derive(Default)]
pub struct RecordingSupervisor {
    spawned: Mutex<Vec<&'static str>>,
    faults: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingSupervisor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn spawned(&self) -> Vec<&'static str> {
        self.spawned.lock().clone()
    }

    pub fn faults(&self) -> Vec<(&'static str, String)> {
        self.faults.lock().clone()
    }
}

impl TaskSupervisor for RecordingSupervisor {
    fn spawn_supervised(
        self: Arc<Self>,
        name: &'static str,
        task: BoxFuture<'static, Result<()>>,
    ) -> JoinHandle<()> {
        self.spawned.lock().push(name);
        tokio::spawn(async move {
            let fault = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e.to_string(),
                Err(_) => "panic".to_string(),
            };
            self.faults.lock().push((name, fault));
        })
    }
}
