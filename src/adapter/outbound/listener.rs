//! IPC listener.
//!
//! Answers every TCP connection with a one-line banner and closes it. The
//! accept loop and each connection run as supervised tasks; the accept loop
//! is stopped through a `watch` channel.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::port::{Listener, TaskSupervisor};

struct Running {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// TCP listener bound on [`IpcListener::start`].
pub struct IpcListener {
    bind: String,
    running: Mutex<Option<Running>>,
}

impl IpcListener {
    pub fn new(bind: impl Into<String>) -> Self {
        Self {
            bind: bind.into(),
            running: Mutex::new(None),
        }
    }

    /// Bind and start accepting. Returns the bound address.
    ///
    /// Faults in the accept loop or a connection are reported to
    /// `supervisor`.
    pub async fn start(&self, supervisor: Arc<dyn TaskSupervisor>) -> Result<SocketAddr> {
        if let Some(addr) = self.local_addr() {
            return Ok(addr);
        }

        let listener = TcpListener::bind(&self.bind)
            .await
            .map_err(|e| Error::Listener(format!("failed to bind {}: {e}", self.bind)))?;
        let local_addr = listener.local_addr()?;
        let (shutdown, rx) = watch::channel(false);
        let task = Arc::clone(&supervisor)
            .spawn_supervised("ipc-accept", Box::pin(accept_loop(listener, rx, supervisor)));

        info!(addr = %local_addr, "IPC listener started");
        *self.running.lock() = Some(Running {
            shutdown,
            task,
            local_addr,
        });
        Ok(local_addr)
    }

    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|r| r.local_addr)
    }
}

#[async_trait]
impl Listener for IpcListener {
    async fn stop(&self) -> Result<()> {
        let Some(running) = self.running.lock().take() else {
            debug!("IPC listener was not running");
            return Ok(());
        };

        let _ = running.shutdown.send(true);
        running
            .task
            .await
            .map_err(|e| Error::Listener(format!("accept loop failed: {e}")))?;
        info!(addr = %running.local_addr, "IPC listener stopped");
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    mut shutdown: watch::Receiver<bool>,
    supervisor: Arc<dyn TaskSupervisor>,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    Arc::clone(&supervisor)
                        .spawn_supervised("ipc-connection", Box::pin(greet(stream, peer)));
                }
                Err(e) => warn!(error = %e, "Failed to accept IPC connection"),
            },
        }
    }
    Ok(())
}

// A peer hanging up early is routine, not a fault.
async fn greet(mut stream: TcpStream, peer: SocketAddr) -> Result<()> {
    let banner = format!("fleetkeeper {} ready\n", env!("CARGO_PKG_VERSION"));
    if let Err(e) = stream.write_all(banner.as_bytes()).await {
        debug!(%peer, error = %e, "Failed to write IPC banner");
        return Ok(());
    }
    let _ = stream.shutdown().await;
    Ok(())
}

/// Listener used when IPC is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledListener;

#[async_trait]
impl Listener for DisabledListener {
    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}
