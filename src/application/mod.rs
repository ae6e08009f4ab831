//! Application layer.
//!
//! Holds the process lifecycle core. Everything here is expressed against the
//! ports in [`crate::port`] and never touches the operating system directly.

pub mod lifecycle;
