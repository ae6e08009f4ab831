//! Fleetkeeper - process lifecycle and shutdown coordination for a
//! long-running bot fleet.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **`port`** - Traits for the collaborators the shutdown sequence drives
//!   (workers, listener, durable log sink, instance lock, relauncher)
//! - **`application::lifecycle`** - The shutdown state machine, the
//!   shutdown coordinator, the lifecycle hub every trigger funnels through,
//!   and the single-assignment exit channel
//! - **`adapter`** - Argument and signal inputs; file lock, log sink, IPC
//!   listener, worker registry and relauncher outputs
//! - **`infrastructure`** - Settings, logging setup, startup gates and the
//!   composition root
//!
//! # Modules
//!
//! - [`adapter`] - Port implementations
//! - [`application`] - Lifecycle logic
//! - [`error`] - Error types for the crate
//! - [`infrastructure`] - Configuration and wiring
//! - [`port`] - Collaborator traits
//!
//! # Features
//!
//! - `testkit` - Expose the [`testkit`] doubles to integration tests

pub mod adapter;
pub mod application;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
