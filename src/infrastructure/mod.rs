//! Infrastructure layer.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root for runtime wiring
//! - [`config`] - Settings loading, validation and logging setup
//! - [`environment`] - Startup environment gates

pub mod bootstrap;
pub mod config;
pub mod environment;
