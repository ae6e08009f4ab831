//! Startup environment checks.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::adapter::inbound::args::StartupOverrides;
use crate::error::StartupError;

pub const CONFIG_DIRECTORY: &str = "config";

/// Refuse environments the process is known not to run correctly in.
///
/// Skipped entirely with `--ignore-unsupported-environment`.
pub fn verify(overrides: &StartupOverrides) -> Result<(), StartupError> {
    if overrides.ignore_unsupported_environment {
        debug!("Skipping environment verification");
        return Ok(());
    }
    check_privileges()
}

#[cfg(unix)]
fn check_privileges() -> Result<(), StartupError> {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };
    if euid == 0 {
        return Err(StartupError::UnsupportedEnvironment {
            reason: "running as root is not supported".to_string(),
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_privileges() -> Result<(), StartupError> {
    Ok(())
}

/// Ask the OS to keep the system awake while the process runs.
///
/// No backend is available on this platform set; the request is logged.
pub fn request_keep_awake(overrides: &StartupOverrides) {
    if overrides.system_required {
        warn!("Keeping the system awake is not supported on this platform");
    }
}

/// The `config` directory under `root` must exist.
pub fn ensure_config_directory(root: &Path) -> Result<PathBuf, StartupError> {
    let path = root.join(CONFIG_DIRECTORY);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(StartupError::MissingConfigDirectory { path })
    }
}
