//! Process relaunch port used by restart.

use crate::error::Result;

/// Starts a replacement for the current process.
pub trait Relauncher: Send + Sync {
    /// Spawn the replacement. Returns once the new process has been started,
    /// not when it is ready.
    fn relaunch(&self) -> Result<()>;
}
