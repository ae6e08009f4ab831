//! Helpers for driving the `fleetkeeper` binary.

#![allow(dead_code)]

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

pub const BIN: &str = env!("CARGO_BIN_EXE_fleetkeeper");

const SETTINGS: &str = "\
[lifecycle]
fatal_grace_ms = 100
post_stop_grace_ms = 0
worker_stop_allowance_ms = 200
restart_handover_ms = 0
";

/// A throwaway installation directory.
pub struct Installation {
    dir: TempDir,
}

impl Installation {
    /// Installation with settings and a `config` directory.
    pub fn new() -> Self {
        let install = Self::without_config_dir();
        std::fs::create_dir(install.path().join("config")).unwrap();
        install
    }

    /// Installation with settings but no `config` directory.
    pub fn without_config_dir() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("fleetkeeper.toml"), SETTINGS).unwrap();
        Self { dir }
    }

    pub fn append_settings(&self, extra: &str) {
        let path = self.path().join("fleetkeeper.toml");
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str(extra);
        std::fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Base command pointed at this installation.
    pub fn command(&self) -> Command {
        let mut command = Command::new(BIN);
        command
            .arg("--path")
            .arg(self.path())
            .arg("--ignore-unsupported-environment")
            .env_remove("RUST_LOG")
            .env_remove("FLEETKEEPER_CRYPTKEY")
            .env_remove("FLEETKEEPER_NETWORK_GROUP")
            .env_remove("FLEETKEEPER_PATH");
        command
    }
}

/// A running binary whose stderr is collected line by line.
pub struct RunningProcess {
    child: Child,
    lines: mpsc::Receiver<String>,
    seen: Vec<String>,
}

impl RunningProcess {
    /// Spawn and wait until the process reports that it started.
    pub fn start(mut command: Command) -> Self {
        let mut child = command
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let stderr = child.stderr.take().unwrap();
        let (tx, lines) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let mut process = Self {
            child,
            lines,
            seen: Vec::new(),
        };
        process.wait_for_line("Started");
        process
    }

    /// Block until a stderr line contains `needle` and return that line.
    pub fn wait_for_line(&mut self, needle: &str) -> String {
        if let Some(line) = self.seen.iter().find(|l| l.contains(needle)) {
            return line.clone();
        }
        let deadline = Instant::now() + Duration::from_secs(20);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => {
                    self.seen.push(line.clone());
                    if line.contains(needle) {
                        return line;
                    }
                }
                Err(_) => panic!(
                    "never saw {needle:?}; stderr so far:\n{}",
                    self.seen.join("\n")
                ),
            }
        }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Send SIGTERM, wait for exit, and return the status and all stderr.
    #[cfg(unix)]
    pub fn terminate(mut self) -> (ExitStatus, Vec<String>) {
        let pid = i32::try_from(self.child.id()).unwrap();
        // SAFETY: pid belongs to our own child, which has not been reaped.
        unsafe {
            libc::kill(pid, libc::SIGTERM);
        }
        let status = self.child.wait().unwrap();
        while let Ok(line) = self.lines.recv_timeout(Duration::from_secs(5)) {
            self.seen.push(line);
        }
        (status, std::mem::take(&mut self.seen))
    }
}

impl Drop for RunningProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
