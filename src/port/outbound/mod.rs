//! Outbound ports consumed by the shutdown sequence.

mod instance;
mod listener;
mod log_sink;
mod relaunch;
mod supervisor;
mod worker;

pub use instance::InstanceLock;
pub use listener::Listener;
pub use log_sink::DurableLogSink;
pub use relaunch::Relauncher;
pub use supervisor::TaskSupervisor;
pub use worker::{FleetCount, Worker, WorkerSet};
