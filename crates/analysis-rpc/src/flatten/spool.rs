//! Temp-file spool for payloads too large to send inline.
//!
//! Files are created with unique `scisofttmp-*` names. The receiver normally
//! deletes them after loading; a rate-limited sweep removes whatever was
//! left behind by receivers that never loaded them.

use crate::config::FlatteningConfig;
use crate::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

pub struct Spool {
    max_age: Duration,
    sweep_interval: Duration,
    last_sweep: Mutex<Option<Instant>>,
}

impl Default for Spool {
    fn default() -> Self {
        Self::new(
            FlatteningConfig::SPOOL_MAX_AGE,
            FlatteningConfig::SPOOL_SWEEP_INTERVAL,
        )
    }
}

impl Spool {
    pub fn new(max_age: Duration, sweep_interval: Duration) -> Self {
        Self {
            max_age,
            sweep_interval,
            last_sweep: Mutex::new(None),
        }
    }

    /// Write `bytes` to a new spool file in `dir` and return its path.
    pub fn write(&self, dir: &Path, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        self.maybe_sweep(dir);

        let mut file = tempfile::Builder::new()
            .prefix(FlatteningConfig::TEMP_FILE_PREFIX)
            .suffix(FlatteningConfig::DATASET_FILE_SUFFIX)
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        Ok(path)
    }

    /// Whether `path` names a spool file directly inside `dir`.
    pub fn owns(&self, dir: &Path, path: &Path) -> bool {
        let prefixed = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with(FlatteningConfig::TEMP_FILE_PREFIX));
        let parent = match path.parent() {
            Some(parent) => parent,
            None => return false,
        };
        prefixed
            && match (fs::canonicalize(parent), fs::canonicalize(dir)) {
                (Ok(parent), Ok(dir)) => parent == dir,
                _ => parent == dir,
            }
    }

    fn maybe_sweep(&self, dir: &Path) {
        {
            let mut last = self
                .last_sweep
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if last.is_some_and(|t| t.elapsed() < self.sweep_interval) {
                return;
            }
            *last = Some(Instant::now());
        }
        if let Err(e) = self.sweep(dir) {
            warn!("Spool sweep of {} failed: {}", dir.display(), e);
        }
    }

    /// Remove spool files in `dir` older than the maximum age.
    /// Returns the number of files removed.
    pub fn sweep(&self, dir: &Path) -> Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(FlatteningConfig::TEMP_FILE_PREFIX) {
                continue;
            }
            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(_) => continue,
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= self.max_age {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove stale spool file {}: {}", name, e),
            }
        }
        if removed > 0 {
            debug!("Removed {} stale spool files from {}", removed, dir.display());
        }
        Ok(removed)
    }
}
