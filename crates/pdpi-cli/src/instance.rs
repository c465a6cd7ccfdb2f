//! Single-instance guard for `run`
//!
//! Every start terminates stray strategy processes by name, so two running
//! supervisors would keep killing each other's process. An advisory lock on
//! a file in the config directory keeps a second `run` out.

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lock file name inside the config directory
pub const LOCK_FILE: &str = "penguin-dpi.lock";

/// Held for as long as this process supervises; released on drop
#[derive(Debug)]
pub struct InstanceLock {
    _file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Take the lock in `dir`, failing if another instance holds it
    pub fn acquire(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;

        if let Err(e) = file.try_lock_exclusive() {
            debug!(error = %e, path = %path.display(), "Instance lock is held");
            let owner = std::fs::read_to_string(&path).unwrap_or_default();
            let owner = owner.trim();
            if owner.is_empty() {
                bail!("Another Penguin DPI instance is already running");
            }
            bail!("Another Penguin DPI instance is already running (PID {owner})");
        }

        // The PID is informational only
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());
        debug!(path = %path.display(), "Acquired instance lock");
        Ok(Self { _file: file, path })
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
