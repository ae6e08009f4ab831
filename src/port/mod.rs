//! Trait definitions (hexagonal ports).
//!
//! The lifecycle core only talks to the rest of the process through these
//! traits. Adapters in [`crate::adapter`] implement them; tests use the
//! recording doubles in `testkit`.
//!
//! # Available Ports
//!
//! - [`Worker`], [`WorkerSet`] - The fleet of long-lived network sessions
//! - [`Listener`] - The IPC/web listener
//! - [`InstanceLock`] - System-wide single-instance token
//! - [`DurableLogSink`] - Buffered log output that must be flushed on exit
//! - [`Relauncher`] - Starts a replacement process during restart
//! - [`TaskSupervisor`] - Spawns detached tasks whose faults reach the hub

pub mod outbound;

pub use outbound::{
    DurableLogSink, FleetCount, InstanceLock, Listener, Relauncher, TaskSupervisor, Worker,
    WorkerSet,
};
