//! IPC listener port.

use async_trait::async_trait;

use crate::error::Result;

/// The externally reachable listener (IPC / web interface).
#[async_trait]
pub trait Listener: Send + Sync {
    /// Stop accepting requests and wait until the listener has shut down.
    ///
    /// Must be safe to call on a listener that was never started.
    async fn stop(&self) -> Result<()>;
}
