//! OS termination signals.
//!
//! Handlers are installed eagerly by [`TerminationSignals::install`] so a
//! signal that arrives before anyone awaits it is still caught rather than
//! hitting the default disposition.

use tracing::{info, warn};

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Installed termination handlers.
pub struct TerminationSignals {
    #[cfg(unix)]
    streams: Vec<(&'static str, Signal)>,
}

impl TerminationSignals {
    /// Install handlers for SIGINT, SIGTERM, SIGQUIT and SIGHUP on unix, or
    /// Ctrl-C elsewhere. Must be called inside a tokio runtime.
    ///
    /// A handler that fails to install is logged and skipped.
    #[cfg(unix)]
    pub fn install() -> Self {
        let kinds = [
            ("SIGINT", SignalKind::interrupt()),
            ("SIGTERM", SignalKind::terminate()),
            ("SIGQUIT", SignalKind::quit()),
            ("SIGHUP", SignalKind::hangup()),
        ];
        let streams = kinds
            .into_iter()
            .filter_map(|(name, kind)| match signal(kind) {
                Ok(stream) => Some((name, stream)),
                Err(e) => {
                    warn!(signal = name, error = %e, "Failed to install signal handler");
                    None
                }
            })
            .collect();
        Self { streams }
    }

    #[cfg(not(unix))]
    pub fn install() -> Self {
        Self {}
    }

    /// Wait for the first termination request and return its name.
    #[cfg(unix)]
    pub async fn recv(self) -> &'static str {
        let waits: Vec<_> = self
            .streams
            .into_iter()
            .map(|(name, mut stream)| {
                Box::pin(async move {
                    stream.recv().await;
                    name
                })
            })
            .collect();
        if waits.is_empty() {
            warn!("No termination signal handlers installed");
            std::future::pending::<()>().await;
        }

        let (name, _, _) = futures_util::future::select_all(waits).await;
        info!(signal = name, "Shutdown signal received");
        name
    }

    #[cfg(not(unix))]
    pub async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!(signal = "ctrl_c", "Shutdown signal received");
        "ctrl_c"
    }
}
