//! Outbound adapters: concrete implementations of the lifecycle ports.

pub mod fleet;
pub mod instance_lock;
pub mod listener;
pub mod log_sink;
pub mod relaunch;
