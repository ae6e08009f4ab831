//! Inbound adapters: what drives the process from outside.

pub mod args;
pub mod signal;
