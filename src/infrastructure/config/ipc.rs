//! IPC listener configuration.

use serde::Deserialize;

/// `[ipc]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct IpcConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:1242".to_string()
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_bind(),
        }
    }
}
