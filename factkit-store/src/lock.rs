//! Cross-process write lock for the session document.
//!
//! On Unix an exclusive `flock` serializes writers across processes, so two
//! clients sharing one store directory cannot interleave a persist and a
//! clear. On other platforms the lock degrades to a per-handle no-op; writes
//! within one process are still serialized by the store's own mutex.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};

/// A file-backed lock that serializes store mutations across processes.
#[derive(Debug, Clone)]
pub struct StoreLock {
    file: Arc<File>,
}

/// Guard that holds the exclusive lock for its lifetime.
#[derive(Debug)]
pub struct StoreLockGuard {
    file: Arc<File>,
}

impl StoreLock {
    /// Opens or creates the lock file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| map_io_err(&err))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|err| map_io_err(&err))?;
        Ok(Self {
            file: Arc::new(file),
        })
    }

    /// Acquires the exclusive lock, blocking until it is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn lock(&self) -> StoreResult<StoreLockGuard> {
        lock_exclusive(&self.file).map_err(|err| map_io_err(&err))?;
        Ok(StoreLockGuard {
            file: Arc::clone(&self.file),
        })
    }
}

impl Drop for StoreLockGuard {
    fn drop(&mut self) {
        let _ = unlock(&self.file);
    }
}

fn map_io_err(err: &std::io::Error) -> StoreError {
    StoreError::Lock(err.to_string())
}

// ── Unix flock ──────────────────────────────────────────────────────────

#[cfg(unix)]
fn lock_exclusive(file: &File) -> std::io::Result<()> {
    let fd = std::os::unix::io::AsRawFd::as_raw_fd(file);
    let result = unsafe { flock(fd, LOCK_EX) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(unix)]
fn unlock(file: &File) -> std::io::Result<()> {
    let fd = std::os::unix::io::AsRawFd::as_raw_fd(file);
    let result = unsafe { flock(fd, LOCK_UN) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(unix)]
use std::os::raw::c_int;

#[cfg(unix)]
const LOCK_EX: c_int = 2;
#[cfg(unix)]
const LOCK_UN: c_int = 8;

#[cfg(unix)]
extern "C" {
    fn flock(fd: c_int, operation: c_int) -> c_int;
}

// ── Non-Unix: no-op ─────────────────────────────────────────────────────

#[cfg(not(unix))]
fn lock_exclusive(_file: &File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn unlock(_file: &File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let lock = StoreLock::open(&dir.path().join("session.lock")).unwrap();
        let guard = lock.lock().unwrap();
        drop(guard);
        // Re-acquirable after release.
        let _guard = lock.lock().unwrap();
    }
}
