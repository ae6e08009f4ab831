//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`worker`] - Scripted [`Worker`](crate::port::Worker) doubles and a
//!   fixed [`WorkerSet`](crate::port::WorkerSet).
//! - [`lifecycle`] - Recording doubles for the listener, log sink, instance
//!   lock, relauncher and task supervisor ports.

pub mod lifecycle;
pub mod worker;
