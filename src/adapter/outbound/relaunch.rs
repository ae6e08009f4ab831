//! Relaunch through the current executable.

use std::path::PathBuf;
use std::process::Command;

use tracing::info;

use crate::error::Result;
use crate::port::Relauncher;

/// Starts a fresh copy of this binary with the original arguments.
///
/// The child starts in the directory the parent was launched from, so a
/// relative `--path` resolves the same way twice.
#[derive(Debug, Clone)]
pub struct CurrentExecutable {
    args: Vec<String>,
    launch_dir: Option<PathBuf>,
}

impl CurrentExecutable {
    pub fn new(args: Vec<String>, launch_dir: Option<PathBuf>) -> Self {
        Self { args, launch_dir }
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Relauncher for CurrentExecutable {
    fn relaunch(&self) -> Result<()> {
        let exe = std::env::current_exe()?;
        let mut command = Command::new(&exe);
        command.args(&self.args);
        if let Some(dir) = &self.launch_dir {
            command.current_dir(dir);
        }
        let child = command.spawn()?;
        info!(pid = child.id(), exe = %exe.display(), "Replacement process started");
        Ok(())
    }
}
