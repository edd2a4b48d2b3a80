//! Advisory project lock.
//!
//! The engine never locks on its own. Callers acquire a [`ProjectLock`] for
//! the project and hand it to the orchestrator for the duration of one run.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkpError};
use crate::storage::layout::LOCK_FILE;

/// Exclusive advisory lock on `<state_dir>/skp.lock`, released on drop.
#[derive(Debug)]
pub struct ProjectLock {
    file: File,
    lock_path: PathBuf,
}

impl ProjectLock {
    /// Acquire exclusive lock (blocking)
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        let (file, lock_path) = open_lock_file(state_dir)?;
        file.lock_exclusive()?;
        write_lock_info(&file)?;
        Ok(Self { file, lock_path })
    }

    /// Try to acquire lock without blocking
    pub fn try_acquire(state_dir: &Path) -> Result<Option<Self>> {
        let (file, lock_path) = open_lock_file(state_dir)?;
        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(err) if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        }
        write_lock_info(&file)?;
        Ok(Some(Self { file, lock_path }))
    }

    /// Acquire with timeout (polling)
    pub fn acquire_timeout(state_dir: &Path, timeout: Duration) -> Result<Self> {
        let start = Instant::now();
        let poll_interval = Duration::from_millis(50);

        loop {
            if let Some(lock) = Self::try_acquire(state_dir)? {
                return Ok(lock);
            }
            if start.elapsed() >= timeout {
                let holder = Self::read_lock_info(state_dir)
                    .ok()
                    .flatten()
                    .map_or_else(
                        || "unknown holder".to_string(),
                        |info| format!("pid {} on {}", info.pid, info.hostname),
                    );
                return Err(SkpError::LockBusy(holder));
            }
            std::thread::sleep(poll_interval);
        }
    }

    /// Read lock holder info
    pub fn read_lock_info(state_dir: &Path) -> Result<Option<LockInfo>> {
        let lock_path = state_dir.join(LOCK_FILE);
        if !lock_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&lock_path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&content).ok())
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.lock_path.display(), "failed to release lock: {err}");
        }
    }
}

/// Information about the lock holder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
    pub hostname: String,
}

fn open_lock_file(state_dir: &Path) -> Result<(File, PathBuf)> {
    fs::create_dir_all(state_dir)?;
    let lock_path = state_dir.join(LOCK_FILE);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;
    Ok((file, lock_path))
}

fn write_lock_info(file: &File) -> Result<()> {
    let info = LockInfo {
        pid: std::process::id(),
        acquired_at: Utc::now(),
        hostname: hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string()),
    };

    let mut file = file;
    file.set_len(0)?;
    file.write_all(serde_json::to_string_pretty(&info)?.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_acquire_release() {
        let dir = tempdir().unwrap();

        let lock1 = ProjectLock::try_acquire(dir.path()).unwrap();
        assert!(lock1.is_some());
        drop(lock1);

        let lock2 = ProjectLock::try_acquire(dir.path()).unwrap();
        assert!(lock2.is_some());
    }

    #[test]
    fn lock_is_exclusive() {
        let dir = tempdir().unwrap();
        let _lock1 = ProjectLock::try_acquire(dir.path()).unwrap().unwrap();
        assert!(ProjectLock::try_acquire(dir.path()).unwrap().is_none());
    }

    #[test]
    fn timeout_reports_busy() {
        let dir = tempdir().unwrap();
        let _held = ProjectLock::acquire(dir.path()).unwrap();
        let err = ProjectLock::acquire_timeout(dir.path(), Duration::from_millis(120)).unwrap_err();
        assert!(matches!(err, SkpError::LockBusy(_)));
    }

    #[test]
    fn lock_info_written() {
        let dir = tempdir().unwrap();
        let _lock = ProjectLock::acquire(dir.path()).unwrap();
        let info = ProjectLock::read_lock_info(dir.path()).unwrap().unwrap();
        assert_eq!(info.pid, std::process::id());
    }
}
