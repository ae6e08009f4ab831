//! File-backed single-instance lock.
//!
//! The lock file name is derived from a SHA-256 of the installation
//! directory and the optional network group, so separate installations and
//! separate groups never contend. On unix the file is held with a
//! non-blocking exclusive `flock`, which the kernel drops if the process
//! dies. Elsewhere exclusive creation of the file is the token.

use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::port::InstanceLock;

const LOCK_DIR_NAME: &str = "fleetkeeper";

/// Stable identity for an installation and network group.
#[must_use]
pub fn instance_id(install_dir: &Path, network_group: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(install_dir.as_os_str().as_encoded_bytes());
    if let Some(group) = network_group {
        hasher.update(b"\0");
        hasher.update(group.as_bytes());
    }
    let digest = hasher.finalize();
    format!("{digest:x}")[..32].to_string()
}

/// Directory that holds lock files: the user runtime directory when the
/// platform has one, the temp directory otherwise.
#[must_use]
pub fn default_lock_dir() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(env::temp_dir)
        .join(LOCK_DIR_NAME)
}

#[derive(Debug)]
pub struct FileInstanceLock {
    path: PathBuf,
    held: Mutex<Option<File>>,
}

impl FileInstanceLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            held: Mutex::new(None),
        }
    }

    /// Lock for `install_dir` (and `network_group`) inside `lock_dir`.
    pub fn for_installation(
        install_dir: &Path,
        network_group: Option<&str>,
        lock_dir: &Path,
    ) -> Self {
        let id = instance_id(install_dir, network_group);
        Self::new(lock_dir.join(format!("{LOCK_DIR_NAME}-{id}.lock")))
    }

    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.lock().is_some()
    }

    /// Try to take the lock without logging.
    ///
    /// `Ok(false)` means the lock is already taken, by this handle or by
    /// another process. Pair with [`Self::log_claim`] once logging is up.
    pub fn claim(&self) -> io::Result<bool> {
        let mut held = self.held.lock();
        if held.is_some() {
            return Ok(false);
        }
        match self.acquire()? {
            Some(file) => {
                *held = Some(file);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn log_claim(&self, claimed: &io::Result<bool>) {
        match claimed {
            Ok(true) => info!(lock = %self.path.display(), "Acquired instance lock"),
            Ok(false) => {
                warn!(lock = %self.path.display(), "Instance lock held by another process");
            }
            Err(e) => {
                warn!(lock = %self.path.display(), error = %e, "Failed to acquire instance lock");
            }
        }
    }

    fn acquire(&self) -> io::Result<Option<File>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        open_exclusive(&self.path)
    }
}

impl InstanceLock for FileInstanceLock {
    fn register(&self) -> bool {
        if self.is_held() {
            debug!(lock = %self.path.display(), "Instance lock already registered");
            return false;
        }
        let claimed = self.claim();
        self.log_claim(&claimed);
        matches!(claimed, Ok(true))
    }

    fn unregister(&self) {
        let Some(file) = self.held.lock().take() else {
            return;
        };
        release(&self.path, file);
        info!(lock = %self.path.display(), "Released instance lock");
    }
}

#[cfg(unix)]
fn open_exclusive(path: &Path) -> io::Result<Option<File>> {
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::io::AsRawFd;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o600)
        .open(path)?;

    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(Some(file));
    }
    let err = io::Error::last_os_error();
    if err.kind() == io::ErrorKind::WouldBlock {
        Ok(None)
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
fn open_exclusive(path: &Path) -> io::Result<Option<File>> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(e),
    }
}

// The file stays on disk under flock; removing it would let a waiter lock
// an orphaned inode while a newcomer creates a fresh one.
#[cfg(unix)]
fn release(_path: &Path, file: File) {
    drop(file);
}

#[cfg(not(unix))]
fn release(path: &Path, file: File) {
    drop(file);
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(lock = %path.display(), error = %e, "Failed to remove lock file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lock_in(dir: &TempDir, group: Option<&str>) -> FileInstanceLock {
        FileInstanceLock::for_installation(Path::new("/opt/fleet"), group, dir.path())
    }

    #[test]
    fn test_instance_id_is_stable_and_group_scoped() {
        let install = Path::new("/opt/fleet");
        assert_eq!(instance_id(install, None), instance_id(install, None));
        assert_ne!(instance_id(install, None), instance_id(install, Some("a")));
        assert_ne!(instance_id(install, Some("a")), instance_id(install, Some("b")));
        assert_ne!(
            instance_id(install, None),
            instance_id(Path::new("/opt/other"), None)
        );
        assert_eq!(instance_id(install, None).len(), 32);
    }

    #[cfg(unix)]
    #[test]
    fn test_instance_id_keeps_non_utf8_paths_apart() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let a = Path::new(OsStr::from_bytes(b"/opt/fleet-\xff"));
        let b = Path::new(OsStr::from_bytes(b"/opt/fleet-\xfe"));
        assert_eq!(a.to_string_lossy(), b.to_string_lossy());
        assert_ne!(instance_id(a, None), instance_id(b, None));
    }

    #[test]
    fn test_claim_reports_contention_without_holding() {
        let dir = TempDir::new().unwrap();
        let first = lock_in(&dir, None);
        let second = lock_in(&dir, None);

        assert!(first.claim().unwrap());
        assert!(!first.claim().unwrap());
        assert!(!second.claim().unwrap());
        assert!(!second.is_held());

        first.unregister();
        assert!(second.claim().unwrap());
    }

    #[test]
    fn test_register_then_unregister() {
        let dir = TempDir::new().unwrap();
        let lock = lock_in(&dir, None);

        assert!(lock.register());
        assert!(lock.is_held());
        lock.unregister();
        assert!(!lock.is_held());
    }

    #[test]
    fn test_second_instance_is_refused_without_disturbing_first() {
        let dir = TempDir::new().unwrap();
        let first = lock_in(&dir, None);
        let second = lock_in(&dir, None);

        assert!(first.register());
        assert!(!second.register());
        assert!(first.is_held());
        assert!(!second.is_held());

        second.unregister();
        assert!(first.is_held());
    }

    #[test]
    fn test_lock_is_reusable_after_release() {
        let dir = TempDir::new().unwrap();
        let first = lock_in(&dir, None);
        let second = lock_in(&dir, None);

        assert!(first.register());
        first.unregister();
        assert!(second.register());
        second.unregister();
    }

    #[test]
    fn test_unregister_without_register_is_noop() {
        let dir = TempDir::new().unwrap();
        let lock = lock_in(&dir, None);
        lock.unregister();
        lock.unregister();
        assert!(!lock.is_held());
    }

    #[test]
    fn test_double_register_on_same_handle_returns_false() {
        let dir = TempDir::new().unwrap();
        let lock = lock_in(&dir, None);
        assert!(lock.register());
        assert!(!lock.register());
        assert!(lock.is_held());
        lock.unregister();
    }

    #[test]
    fn test_different_groups_coexist() {
        let dir = TempDir::new().unwrap();
        let alpha = lock_in(&dir, Some("alpha"));
        let beta = lock_in(&dir, Some("beta"));

        assert!(alpha.register());
        assert!(beta.register());
        assert_ne!(alpha.lock_path(), beta.lock_path());
    }

    #[test]
    fn test_missing_lock_dir_is_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let lock = FileInstanceLock::for_installation(Path::new("/opt/fleet"), None, &nested);
        assert!(lock.register());
        assert!(lock.lock_path().starts_with(&nested));
    }
}
