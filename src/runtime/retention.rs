use super::exclusive_lock::{try_acquire_exclusive_lock, LockAttempt};
use super::state_paths::RunsPaths;
use super::RuntimeError;
use crate::config::Settings;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub kept: usize,
    pub removed: usize,
    /// Expired `.<name>.tmp-*` files left in the runs root by interrupted
    /// archive writes.
    pub temp_files_removed: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SweepOutcome {
    Swept(SweepReport),
    /// Another instance held the retention lock.
    Skipped,
}

/// Deletes run directories (and their archives) whose modification time is
/// older than the retention window. At most one sweeper runs at a time per
/// runs root, coordinated through an advisory lock file inside that root.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    paths: RunsPaths,
    retention: Duration,
}

impl RetentionSweeper {
    pub fn new(paths: RunsPaths, retention: Duration) -> Self {
        Self { paths, retention }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            RunsPaths::new(settings.runs_dir.clone()),
            settings.retention_window(),
        )
    }

    pub fn sweep(&self) -> Result<SweepOutcome, RuntimeError> {
        self.sweep_at(SystemTime::now())
    }

    pub fn sweep_at(&self, now: SystemTime) -> Result<SweepOutcome, RuntimeError> {
        if !self.paths.root().is_dir() {
            return Ok(SweepOutcome::Swept(SweepReport::default()));
        }
        let cutoff = now.checked_sub(self.retention).unwrap_or(UNIX_EPOCH);

        let _lock = match try_acquire_exclusive_lock(&self.paths.retention_lock_path())? {
            LockAttempt::Acquired(lock) => lock,
            LockAttempt::Busy => return Ok(SweepOutcome::Skipped),
        };
        self.scan(cutoff).map(SweepOutcome::Swept)
    }

    fn scan(&self, cutoff: SystemTime) -> Result<SweepReport, RuntimeError> {
        let root = self.paths.root();
        let entries = fs::read_dir(root).map_err(|source| RuntimeError::ReadDir {
            path: root.display().to_string(),
            source,
        })?;

        let mut report = SweepReport::default();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    tracing::warn!(error = %err, "retention sweep could not read entry");
                    report.errors += 1;
                    continue;
                }
            };
            if !path.is_dir() {
                match self.sweep_temp_file(&path, cutoff) {
                    Ok(true) => report.temp_files_removed += 1,
                    Ok(false) => {}
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "retention sweep error");
                        report.errors += 1;
                    }
                }
                continue;
            }
            match self.sweep_entry(&path, cutoff) {
                Ok(true) => report.removed += 1,
                Ok(false) => report.kept += 1,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "retention sweep error");
                    report.errors += 1;
                }
            }
        }
        Ok(report)
    }

    fn sweep_temp_file(&self, path: &Path, cutoff: SystemTime) -> Result<bool, RuntimeError> {
        let is_temp = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.') && name.contains(".tmp-"));
        if !is_temp || modified_at(path)? >= cutoff {
            return Ok(false);
        }
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(RuntimeError::Remove {
                    path: path.display().to_string(),
                    source,
                })
            }
        }
        tracing::debug!(path = %path.display(), "stale temp file removed");
        Ok(true)
    }

    fn sweep_entry(&self, run_dir: &Path, cutoff: SystemTime) -> Result<bool, RuntimeError> {
        if modified_at(run_dir)? >= cutoff {
            return Ok(false);
        }

        fs::remove_dir_all(run_dir).map_err(|source| RuntimeError::Remove {
            path: run_dir.display().to_string(),
            source,
        })?;
        if let Some(run_id) = run_dir.file_name().and_then(|name| name.to_str()) {
            let archive = self.paths.archive_path(run_id);
            match fs::remove_file(&archive) {
                Ok(()) => {}
                Err(source) if source.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(RuntimeError::Remove {
                        path: archive.display().to_string(),
                        source,
                    })
                }
            }
        }
        tracing::debug!(path = %run_dir.display(), "expired run removed");
        Ok(true)
    }

    /// Startup entry point. Logs the outcome and swallows every error.
    pub fn run_at_startup(&self) -> Option<SweepOutcome> {
        match self.sweep() {
            Ok(SweepOutcome::Swept(report)) => {
                tracing::info!(
                    kept = report.kept,
                    removed = report.removed,
                    temp_files_removed = report.temp_files_removed,
                    errors = report.errors,
                    "retention sweep finished"
                );
                Some(SweepOutcome::Swept(report))
            }
            Ok(SweepOutcome::Skipped) => {
                tracing::info!("retention sweep skipped; another instance holds the lock");
                Some(SweepOutcome::Skipped)
            }
            Err(err) => {
                tracing::error!(error = %err, "retention sweep failed");
                None
            }
        }
    }
}

fn modified_at(path: &Path) -> Result<SystemTime, RuntimeError> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| RuntimeError::Metadata {
            path: path.display().to_string(),
            source,
        })
}
