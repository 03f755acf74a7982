//! PID file for locating a running heartbeat process.
//!
//! External tooling (and the end-to-end tests) send signals to the process;
//! the PID file tells them where. The file is removed when the guard is
//! dropped, which the binary does explicitly before any `process::exit`.
//!
//! This is advisory, not a lock: a crash leaves a stale file behind, which
//! the next start detects and replaces.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{HeartbeatError, Result};

/// PID file guard that automatically cleans up on drop.
#[derive(Debug)]
pub struct PidFileGuard {
    path: PathBuf,
}

impl PidFileGuard {
    /// Write the current PID to `path`.
    ///
    /// Returns an error if the file already names a live process. A file
    /// naming a dead process is treated as stale and replaced.
    pub fn acquire_at(path: PathBuf) -> Result<Self> {
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => {
                    if let Ok(pid) = content.trim().parse::<u32>() {
                        if is_process_running(pid) {
                            return Err(HeartbeatError::Config(format!(
                                "Heartbeat already running with PID {}. \
                                 If this is incorrect, remove {} and try again.",
                                pid,
                                path.display()
                            )));
                        }
                        warn!(
                            "Found stale PID file for non-running process {}. Cleaning up.",
                            pid
                        );
                    }
                    let _ = fs::remove_file(&path);
                }
                Err(e) => {
                    warn!("Failed to read PID file: {}. Assuming stale and removing.", e);
                    let _ = fs::remove_file(&path);
                }
            }
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                HeartbeatError::Config(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let pid = std::process::id();
        fs::write(&path, format!("{}\n", pid)).map_err(|e| {
            HeartbeatError::Config(format!("Failed to write PID file {}: {}", path.display(), e))
        })?;

        Ok(Self { path })
    }

    /// Get the path to the PID file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove PID file {}: {}", self.path.display(), e);
        }
    }
}

/// Best-effort liveness check via `/proc/<pid>`.
///
/// Where `/proc` is unavailable this always reports the process as gone, so
/// an existing PID file is overwritten.
fn is_process_running(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}
