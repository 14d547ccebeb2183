//! Advisory cross-process locks for store write paths.
//!
//! The in-process lock maps serialize writers inside one process; this guard
//! extends the same exclusion to a second process on the same data directory
//! (a CLI ingest racing a running server). Each category/service gets a
//! sidecar `.<slug>.lock` file that writers flock exclusively for the span
//! of their read-modify-write cycle.

use std::fs::File;
use std::io;
use std::path::Path;

/// Exclusive advisory lock on a sidecar lock file.
///
/// Held until drop: closing the descriptor releases the lock, so the guard
/// must live across the entire read-check-rename sequence it protects.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
}

impl FileLock {
    /// Block until the lock file can be locked exclusively.
    ///
    /// # Errors
    ///
    /// I/O errors creating or locking the sidecar file.
    pub fn acquire(path: &Path) -> io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)?;
        flock_exclusive(&file)?;
        Ok(Self { _file: file })
    }
}

#[cfg(unix)]
fn flock_exclusive(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: flock is a standard POSIX call; the descriptor is valid for
    // the lifetime of `file`. LOCK_EX blocks until exclusive.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn flock_exclusive(_file: &File) -> io::Result<()> {
    Ok(())
}
