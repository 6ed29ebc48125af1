//! Lock file management for single-instance enforcement.
//!
//! The lock lives at `$XDG_RUNTIME_DIR/moonlite.lock` (falling back to
//! `/tmp`) and holds the PID of the running daemon, which `moonlite reload`
//! reads to find its target. A lock left behind by a dead process is removed
//! and the acquisition retried once.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::utils;

/// Held lock; the file stays locked for as long as this value lives.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unlock and delete the lock file.
    pub fn release(self) {
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Result of trying to become the single running instance.
#[derive(Debug)]
pub enum LockOutcome {
    Acquired(LockFile),
    /// Another live process holds the lock.
    AlreadyRunning { pid: Option<u32> },
}

/// Default lock file location.
pub fn get_lock_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("moonlite.lock")
}

/// Acquire the lock at the default location.
pub fn acquire_lock() -> Result<LockOutcome> {
    acquire_lock_at(&get_lock_path())
}

/// Acquire the lock at `path`, clearing a stale lock once if needed.
pub fn acquire_lock_at(path: &Path) -> Result<LockOutcome> {
    if let Some(lock) = try_lock(path)? {
        return Ok(LockOutcome::Acquired(lock));
    }

    let pid = read_lock_pid(path);
    match pid {
        Some(pid) if utils::is_process_running(pid) => {
            return Ok(LockOutcome::AlreadyRunning { pid: Some(pid) });
        }
        Some(pid) => {
            log_warning!("Removing stale lock file (process {pid} no longer running)");
        }
        None => {
            log_warning!("Lock file contains no valid PID, removing stale lock");
        }
    }
    let _ = std::fs::remove_file(path);

    match try_lock(path)? {
        Some(lock) => Ok(LockOutcome::Acquired(lock)),
        None => Ok(LockOutcome::AlreadyRunning {
            pid: read_lock_pid(path),
        }),
    }
}

fn try_lock(path: &Path) -> Result<Option<LockFile>> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", path.display()))?;

    if file.try_lock_exclusive().is_err() {
        return Ok(None);
    }

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(&file, "{}", std::process::id())?;
    file.flush()?;

    Ok(Some(LockFile {
        file,
        path: path.to_path_buf(),
    }))
}

/// PID recorded in the lock file at `path`, if readable.
pub fn read_lock_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()?
        .lines()
        .next()?
        .trim()
        .parse()
        .ok()
}
