//! Process lifecycle: shutdown state, the exit channel, the shutdown
//! coordinator, and the hub that funnels every trigger into it.

pub mod coordinator;
pub mod exit;
pub mod hub;
pub mod state;

pub use coordinator::{
    stop_workers, ShutdownCollaborators, ShutdownCoordinator, ShutdownTimings, WorkerStopReport,
};
pub use exit::{exit_channel, ExitOutcome, ExitReceiver, ExitSender};
pub use hub::{BackgroundFaultPolicy, FaultDisposition, HubSettings, LifecycleHub};
pub use state::{ShutdownState, ShutdownStateCell};
