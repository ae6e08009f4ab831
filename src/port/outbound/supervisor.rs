//! Supervised task spawning port.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Spawns detached work whose failure is reported instead of lost.
pub trait TaskSupervisor: Send + Sync {
    /// Spawn `task` on the runtime.
    ///
    /// An error or panic inside `task` is reported as a background fault. The
    /// returned handle completes when `task` does, without waiting for the
    /// report to be handled.
    fn spawn_supervised(
        self: Arc<Self>,
        name: &'static str,
        task: BoxFuture<'static, Result<()>>,
    ) -> JoinHandle<()>;
}
