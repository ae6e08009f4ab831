//! Composition root.
//!
//! [`launch`] resolves overrides, loads settings, registers the instance,
//! installs logging, wires the lifecycle hub to the concrete adapters and
//! runs the startup gates. If a gate fails the process logs why, waits the
//! fatal grace delay and exits with code 1 through the normal shutdown path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::adapter::inbound::args::{ArgumentResolver, StartupOverrides};
use crate::adapter::inbound::signal::TerminationSignals;
use crate::adapter::outbound::fleet::WorkerRegistry;
use crate::adapter::outbound::instance_lock::{default_lock_dir, FileInstanceLock};
use crate::adapter::outbound::listener::{DisabledListener, IpcListener};
use crate::adapter::outbound::log_sink::ConsoleLogSink;
use crate::adapter::outbound::relaunch::CurrentExecutable;
use crate::application::lifecycle::{
    exit_channel, ExitReceiver, LifecycleHub, ShutdownCollaborators, ShutdownCoordinator,
};
use crate::error::{Error, Result, StartupError};
use crate::infrastructure::config::Settings;
use crate::infrastructure::environment;
use crate::port::{DurableLogSink, Listener};

/// A launched process: the exit channel to wait on plus the live hub and
/// worker fleet.
pub struct Launched {
    pub exit: ExitReceiver,
    pub hub: Arc<LifecycleHub>,
    pub fleet: Arc<WorkerRegistry>,
}

/// Start the process from its argument tokens (program name excluded).
pub async fn launch(tokens: Vec<String>) -> Launched {
    let launch_dir = std::env::current_dir().ok();
    let resolution = ArgumentResolver::from_process().resolve(&tokens);
    let overrides = Arc::new(resolution.overrides.clone());

    let root = working_root();
    let (settings, settings_problem) = Settings::load_or_default(&root);

    let instance = Arc::new(FileInstanceLock::for_installation(
        &root,
        overrides.network_group.as_deref(),
        &default_lock_dir(),
    ));
    let claimed = instance.claim();
    let unique = matches!(claimed, Ok(true));

    let (log_sink, logging_problem) = match settings.logging.init(unique) {
        Ok(sink) => (sink, None),
        Err(e) => {
            eprintln!("fleetkeeper: {e}");
            let console: Arc<dyn DurableLogSink> = Arc::new(ConsoleLogSink);
            (console, Some(e))
        }
    };

    install_panic_hook();
    instance.log_claim(&claimed);
    resolution.log_warnings();
    if let Some(e) = settings_problem {
        warn!(error = %e, "Ignoring settings file, using defaults");
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        root = %root.display(),
        unique,
        "fleetkeeper starting"
    );

    let ipc = settings
        .ipc
        .enabled
        .then(|| Arc::new(IpcListener::new(settings.ipc.bind.clone())));
    let listener: Arc<dyn Listener> = match &ipc {
        Some(ipc) => Arc::clone(ipc) as Arc<dyn Listener>,
        None => Arc::new(DisabledListener),
    };
    let fleet = Arc::new(WorkerRegistry::new());

    let coordinator = ShutdownCoordinator::new(
        ShutdownCollaborators {
            listener,
            workers: fleet.clone(),
            log_sink,
            instance: instance.clone(),
        },
        settings.lifecycle.timings(),
    );
    let (exit_tx, exit) = exit_channel();
    let hub = Arc::new(LifecycleHub::new(
        coordinator,
        exit_tx,
        Arc::clone(&overrides),
        Arc::new(CurrentExecutable::new(tokens, launch_dir)),
        settings.lifecycle.hub_settings(),
    ));

    let gates = if unique {
        match logging_problem {
            Some(e) => Err(e.into()),
            None => run_gates(&overrides, &root),
        }
    } else {
        Err(StartupError::DuplicateInstance {
            lock: instance.lock_path().to_path_buf(),
        }
        .into())
    };

    if let Err(e) = gates {
        abort(&hub, &e, settings.lifecycle.fatal_grace()).await;
        return Launched { exit, hub, fleet };
    }

    let signals = TerminationSignals::install();
    let signal_hub = Arc::clone(&hub);
    hub.spawn_background("signal-watcher", async move {
        signals.recv().await;
        signal_hub.on_termination_signal().await;
        Ok(())
    });
    hub.watch_fleet(fleet.subscribe_count());

    let primary_hub = Arc::clone(&hub);
    tokio::spawn(async move {
        let services = start_services(ipc, Arc::clone(&primary_hub));
        primary_hub.supervise_primary(services).await;
    });

    Launched { exit, hub, fleet }
}

fn working_root() -> PathBuf {
    std::env::current_dir()
        .and_then(|dir| dir.canonicalize())
        .unwrap_or_else(|_| PathBuf::from("."))
}

fn run_gates(overrides: &StartupOverrides, root: &std::path::Path) -> Result<()> {
    environment::request_keep_awake(overrides);
    environment::verify(overrides)?;
    environment::ensure_config_directory(root)?;
    Ok(())
}

async fn abort(hub: &LifecycleHub, error: &Error, grace: Duration) {
    error!(
        error = %error,
        grace_ms = grace.as_millis() as u64,
        "Startup aborted"
    );
    tokio::time::sleep(grace).await;
    hub.exit(1).await;
}

// Panics are caught by the task wrappers; this routes the message through
// the subscriber instead of raw stderr.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic| {
        error!(panic = %panic, "Panicked");
    }));
}

async fn start_services(ipc: Option<Arc<IpcListener>>, hub: Arc<LifecycleHub>) -> Result<()> {
    if let Some(ipc) = ipc {
        ipc.start(hub).await?;
    }
    info!("Started");
    Ok(())
}
