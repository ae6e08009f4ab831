//! Lifecycle signal hub.
//!
//! Every way the process can end funnels through here:
//!
//! - [`LifecycleHub::exit`] - explicit request with a code
//! - [`LifecycleHub::on_termination_signal`] - OS asked us to go away (code 0)
//! - [`LifecycleHub::on_unhandled_fault`] - the primary task failed (code 1)
//! - [`LifecycleHub::on_background_fault`] - a detached task failed (logged,
//!   not escalated unless configured)
//!
//! The coordinator guarantees a single sequence; the winner resolves the exit
//! channel once the sequence has completed. Resolution happens on the
//! sequence's own task, so it still happens if the winning caller goes away.

use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::coordinator::ShutdownCoordinator;
use super::exit::ExitSender;
use super::state::ShutdownState;
use crate::adapter::inbound::args::StartupOverrides;
use crate::error::Result;
use crate::port::{FleetCount, Relauncher, TaskSupervisor};

/// How faults in detached tasks are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundFaultPolicy {
    /// Log at error severity and carry on.
    Observe,
    /// Treat like a primary fault and exit with code 1.
    Escalate,
}

/// What happened to a reported background fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultDisposition {
    Observed,
    Escalated,
}

/// Hub settings that are not part of the startup overrides.
#[derive(Debug, Clone, Copy)]
pub struct HubSettings {
    pub background_faults: BackgroundFaultPolicy,
    pub restart_handover: Duration,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            background_faults: BackgroundFaultPolicy::Observe,
            restart_handover: Duration::from_secs(2),
        }
    }
}

/// Single entry point into process shutdown.
pub struct LifecycleHub {
    coordinator: Arc<ShutdownCoordinator>,
    exit: ExitSender,
    overrides: Arc<StartupOverrides>,
    relauncher: Arc<dyn Relauncher>,
    settings: HubSettings,
}

impl LifecycleHub {
    #[must_use]
    pub fn new(
        coordinator: ShutdownCoordinator,
        exit: ExitSender,
        overrides: Arc<StartupOverrides>,
        relauncher: Arc<dyn Relauncher>,
        settings: HubSettings,
    ) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            exit,
            overrides,
            relauncher,
            settings,
        }
    }

    #[must_use]
    pub fn overrides(&self) -> &StartupOverrides {
        &self.overrides
    }

    #[must_use]
    pub fn shutdown_state(&self) -> ShutdownState {
        self.coordinator.state()
    }

    /// Run the shutdown sequence and, if this call ran it, resolve `code`.
    ///
    /// Returns `false` without waiting when another trigger got there first.
    pub async fn shutdown(&self, code: u8) -> bool {
        let exit = self.exit.clone();
        self.coordinator
            .run_then(async move {
                exit.resolve(code);
            })
            .await
    }

    /// Explicit exit request.
    pub async fn exit(&self, code: u8) -> bool {
        if code != 0 {
            error!(code, "Exiting with non-zero exit code");
        }
        self.shutdown(code).await
    }

    /// OS termination notice. Cleanup is best-effort.
    pub async fn on_termination_signal(&self) -> bool {
        info!("Termination requested by the operating system");
        self.shutdown(0).await
    }

    /// A fault on the primary execution context. Always exits with code 1.
    pub async fn on_unhandled_fault(&self, fault: &(dyn Display + Sync)) -> bool {
        error!(fault = %fault, "Fatal unhandled fault");
        self.exit(1).await
    }

    /// A fault in a detached task.
    ///
    /// Logged at error severity. Under the default policy it is marked observed
    /// and the process keeps running; these faults mostly originate in
    /// third-party networking code.
    pub async fn on_background_fault(
        &self,
        task: &str,
        fault: &(dyn Display + Sync),
    ) -> FaultDisposition {
        error!(task, fault = %fault, "Fatal fault in background task");
        match self.settings.background_faults {
            BackgroundFaultPolicy::Observe => FaultDisposition::Observed,
            BackgroundFaultPolicy::Escalate => {
                self.exit(1).await;
                FaultDisposition::Escalated
            }
        }
    }

    /// Spawn detached work whose failure is reported as a background fault.
    ///
    /// The report is handled on a task of its own. An escalated shutdown may
    /// wait on the faulted task (the IPC accept loop, say), so the faulted
    /// task must not wait on the shutdown.
    pub fn spawn_background<F>(self: &Arc<Self>, name: &'static str, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let fault = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };
            tokio::spawn(async move {
                hub.on_background_fault(name, &fault).await;
            });
        })
    }

    /// Run the primary task; an error or panic escalates to exit code 1.
    pub async fn supervise_primary<F>(self: &Arc<Self>, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let fault = match tokio::spawn(task).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(join) => join.to_string(),
        };
        self.on_unhandled_fault(&fault).await;
    }

    /// Restart the process in place.
    ///
    /// Ignored when restarts are disabled. Otherwise tears down through the
    /// shutdown sequence, starts a replacement, and resolves code 0 after the
    /// hand-over delay.
    pub async fn restart(&self) -> bool {
        if !self.overrides.allow_restart {
            warn!("Restart requested but restarts are disabled");
            return false;
        }
        let relauncher = Arc::clone(&self.relauncher);
        let handover = self.settings.restart_handover;
        let exit = self.exit.clone();
        self.coordinator
            .run_then(async move {
                info!("Restarting");
                if let Err(e) = relauncher.relaunch() {
                    error!(error = %e, "Failed to start replacement process");
                }
                tokio::time::sleep(handover).await;
                exit.resolve(0);
            })
            .await
    }

    /// The fleet went from some workers to none.
    pub async fn on_fleet_drained(&self) -> bool {
        if self.overrides.process_required {
            info!("No active workers left, staying resident (process required)");
            return false;
        }
        info!("No active workers left, exiting");
        self.shutdown(0).await
    }

    /// Watch the fleet and react each time it drains.
    pub fn watch_fleet(
        self: &Arc<Self>,
        mut fleet: watch::Receiver<FleetCount>,
    ) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        self.spawn_background("fleet-watcher", async move {
            let mut drains = fleet.borrow_and_update().drains;
            while fleet.changed().await.is_ok() {
                let current = fleet.borrow_and_update().drains;
                if current > drains && hub.on_fleet_drained().await {
                    break;
                }
                drains = current;
            }
            Ok(())
        })
    }
}

impl TaskSupervisor for LifecycleHub {
    fn spawn_supervised(
        self: Arc<Self>,
        name: &'static str,
        task: BoxFuture<'static, Result<()>>,
    ) -> JoinHandle<()> {
        self.spawn_background(name, task)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
