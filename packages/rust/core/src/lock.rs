//! Single-instance guard for an archive directory.
//!
//! A `lock.pid` file in the archive root holds the PID of the running
//! pipeline. A lock whose PID is no longer alive is treated as stale and
//! replaced.
//!
//! Liveness is checked by PID only, so a reused PID makes a stale lock look
//! held. The lock then has to be removed by hand.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use broadsheet_shared::{BroadsheetError, Result};

/// Lock file name inside the archive root.
pub const LOCK_FILE_NAME: &str = "lock.pid";

/// Attempts before giving up on a lock file that keeps reappearing.
const ACQUIRE_ATTEMPTS: usize = 3;

/// Answers whether a process is still running.
pub trait ProcessProbe: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Probes the host with `kill -0 <pid>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn is_alive(&self, pid: u32) -> bool {
        std::process::Command::new("kill")
            .arg("-0")
            .arg(pid.to_string())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

#[derive(Debug)]
enum LockState {
    HeldBy(u32),
    /// Left behind by a dead process, or without a usable PID. Carries the
    /// content that was judged stale.
    Stale { pid: Option<u32>, content: String },
    Gone,
}

/// Held archive lock. The lock file is removed on drop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    pid: u32,
}

impl InstanceLock {
    /// Take the lock for `archive_dir`, creating the directory if needed.
    ///
    /// Fails with [`BroadsheetError::Locked`] when another live process
    /// holds it.
    pub fn acquire(archive_dir: &Path, probe: &dyn ProcessProbe) -> Result<Self> {
        std::fs::create_dir_all(archive_dir).map_err(|e| BroadsheetError::io(archive_dir, e))?;
        let path = archive_dir.join(LOCK_FILE_NAME);
        let pid = std::process::id();

        for _ in 0..ACQUIRE_ATTEMPTS {
            match OpenOptions::new().create_new(true).write(true).open(&path) {
                Ok(mut file) => {
                    writeln!(file, "{pid}").map_err(|e| BroadsheetError::io(&path, e))?;
                    debug!(pid, path = %path.display(), "archive lock acquired");
                    return Ok(Self { path, pid });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(BroadsheetError::io(&path, e)),
            }

            match inspect(&path, probe)? {
                LockState::HeldBy(holder) => {
                    return Err(BroadsheetError::Locked { pid: holder, path });
                }
                LockState::Stale { pid: Some(stale), content } => {
                    warn!(pid = stale, path = %path.display(), "removing stale lock file");
                    take_over(&path, &content)?;
                }
                LockState::Stale { pid: None, content } => {
                    warn!(path = %path.display(), "removing lock file without a valid PID");
                    take_over(&path, &content)?;
                }
                LockState::Gone => {}
            }
        }

        Err(BroadsheetError::io(
            &path,
            std::io::Error::new(ErrorKind::AlreadyExists, "lock file keeps reappearing"),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        // Another process may have replaced the file after deciding it was stale.
        match read_pid(&self.path) {
            Some(pid) if pid == self.pid => {
                let _ = std::fs::remove_file(&self.path);
            }
            _ => warn!(path = %self.path.display(), "lock file no longer ours, leaving it"),
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn inspect(path: &Path, probe: &dyn ProcessProbe) -> Result<LockState> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LockState::Gone),
        Err(e) => return Err(BroadsheetError::io(path, e)),
    };

    let parsed = content.trim().parse::<u32>();
    let state = match parsed {
        Ok(0) | Err(_) => LockState::Stale { pid: None, content },
        // Our own PID can only be left over from an earlier process.
        Ok(pid) if pid == std::process::id() => LockState::Stale { pid: Some(pid), content },
        Ok(pid) if probe.is_alive(pid) => LockState::HeldBy(pid),
        Ok(pid) => LockState::Stale { pid: Some(pid), content },
    };
    Ok(state)
}

/// Remove a lock file judged stale, unless it changed since it was read.
///
/// The file is first renamed aside, so only one process can claim a given
/// stale file. If the claimed file turns out to differ from `expected`, a
/// competitor replaced it in the meantime and it is linked back in place.
fn take_over(path: &Path, expected: &str) -> Result<()> {
    let tombstone =
        path.with_file_name(format!(".{LOCK_FILE_NAME}.{}.stale", std::process::id()));

    match std::fs::rename(path, &tombstone) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(BroadsheetError::io(path, e)),
    }

    let claimed =
        std::fs::read_to_string(&tombstone).map_err(|e| BroadsheetError::io(&tombstone, e))?;
    if claimed != expected {
        debug!(path = %path.display(), "lock file changed while inspecting, restoring it");
        if let Err(e) = std::fs::hard_link(&tombstone, path) {
            warn!(path = %path.display(), error = %e, "failed to restore replaced lock file");
        }
    }

    std::fs::remove_file(&tombstone).map_err(|e| BroadsheetError::io(&tombstone, e))
}
