//! Repository locking for concurrent safety.
//!
//! Uses advisory file locks (`flock(2)` on Unix) via the `fs2` crate.
//! The OS automatically releases locks when a process crashes, so no
//! PID tracking or stale lock detection is needed.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{GitletError, GitletResult};

/// An exclusive repository lock.
///
/// Held for the lifetime of the value. When dropped, the lock is
/// released automatically (both the `flock` and the `File` handle).
pub struct RepoLock {
    _file: File,
}

impl RepoLock {
    /// Acquire an exclusive lock on the repository.
    ///
    /// Polls with a short sleep interval until the lock is acquired or
    /// the timeout expires. Returns `GitletError::LockTimeout` on failure.
    pub fn acquire(gitlet_dir: &Path, timeout: Duration) -> GitletResult<Self> {
        let lock_path = gitlet_dir.join("gitlet.lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;

        let start = Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(RepoLock { _file: file }),
                Err(_) if start.elapsed() >= timeout => {
                    return Err(GitletError::LockTimeout);
                }
                Err(_) => std::thread::sleep(poll_interval),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_acquire_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("gitlet.lock");

        {
            let _lock = RepoLock::acquire(dir.path(), Duration::from_secs(1)).unwrap();
            assert!(lock_path.exists());
        }
        // After drop, a new lock should succeed immediately.
        let _lock2 = RepoLock::acquire(dir.path(), Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn test_lock_blocks_second() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_path_buf();

        let _lock = RepoLock::acquire(&dir_path, Duration::from_secs(1)).unwrap();

        // Second attempt with a very short timeout should fail.
        let result = RepoLock::acquire(&dir_path, Duration::from_millis(50));
        assert!(matches!(result, Err(GitletError::LockTimeout)));
    }

    #[test]
    fn test_lock_released_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_path_buf();

        let handle = {
            let dp = dir_path.clone();
            std::thread::spawn(move || {
                let _lock = RepoLock::acquire(&dp, Duration::from_secs(5)).unwrap();
                std::thread::sleep(Duration::from_millis(100));
            })
        };
        std::thread::sleep(Duration::from_millis(20));

        // The thread holds the lock for ~100ms; give ourselves 2s to acquire.
        let lock2 = RepoLock::acquire(&dir_path, Duration::from_secs(2));
        assert!(lock2.is_ok());

        handle.join().unwrap();
    }
}
