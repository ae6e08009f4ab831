//! Settings file loading and validation.
//!
//! Settings live in `fleetkeeper.toml` in the working directory. Every
//! section and field is optional. A missing file means defaults; a broken
//! file is reported to the caller, who logs it and carries on with defaults.

use std::path::Path;

use serde::Deserialize;

use super::ipc::IpcConfig;
use super::lifecycle::LifecycleConfig;
use super::logging::LoggingConfig;
use crate::error::{ConfigError, Error, Result};

pub const SETTINGS_FILE: &str = "fleetkeeper.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ipc: IpcConfig,
}

impl Settings {
    pub fn parse_toml(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load `fleetkeeper.toml` from `dir`.
    ///
    /// Never fails: the second element carries the problem, if any, and the
    /// first is then the defaults.
    pub fn load_or_default(dir: &Path) -> (Self, Option<Error>) {
        let path = dir.join(SETTINGS_FILE);
        if !path.exists() {
            return (Self::default(), None);
        }
        match Self::load(&path) {
            Ok(settings) => (settings, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.lifecycle.worker_stop_allowance_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker_stop_allowance_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level",
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if self.ipc.enabled && self.ipc.bind.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ipc.bind",
                reason: "required when ipc is enabled".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
