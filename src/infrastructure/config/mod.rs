//! Infrastructure configuration modules.

pub mod ipc;
pub mod lifecycle;
pub mod logging;
pub mod settings;

pub use settings::Settings;
