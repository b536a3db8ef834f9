//! Run-level lock marker.
//!
//! The lock is a file whose existence means a run is in progress. It carries
//! no owner and never expires; a crashed run leaves it behind and it must be
//! removed by hand.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{MigrateError, MigrateResult};

/// Held lock. Dropping it removes the marker.
#[derive(Debug)]
pub struct MigrationLock {
    path: PathBuf,
}

impl MigrationLock {
    /// Create the marker, failing immediately if it already exists.
    pub fn acquire(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let path = path.as_ref().to_path_buf();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                debug!(path = %path.display(), "lock acquired");
                Ok(Self { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(MigrateError::LockAlreadyHeld(path)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "lock released"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove lock file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".dbshift.lock");

        let lock = MigrationLock::acquire(&path).unwrap();
        assert!(path.exists());
        assert_eq!(lock.path(), path.as_path());
        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_second_acquire_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".dbshift.lock");

        let _lock = MigrationLock::acquire(&path).unwrap();
        let err = MigrationLock::acquire(&path).unwrap_err();
        assert!(matches!(err, MigrateError::LockAlreadyHeld(p) if p == path));
    }

    #[test]
    fn test_stale_marker_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".dbshift.lock");
        fs::write(&path, "").unwrap();
        assert!(MigrationLock::acquire(&path).is_err());
        assert!(path.exists());
    }
}
