use super::RuntimeError;
use std::fs;
use std::path::{Path, PathBuf};

pub const RUN_RECORD_FILE_NAME: &str = "run.json";
pub const ARCHIVE_EXTENSION: &str = "zip";
pub const RETENTION_LOCK_FILE_NAME: &str = ".retention_lock";

/// On-disk layout of the run store:
///
/// ```text
/// <root>/<run_id>/run.json
/// <root>/<run_id>/<artifact files>
/// <root>/<run_id>.zip
/// <root>/.retention_lock
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunsPaths {
    pub root: PathBuf,
}

impl RunsPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id)
    }

    pub fn record_path(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join(RUN_RECORD_FILE_NAME)
    }

    pub fn archive_path(&self, run_id: &str) -> PathBuf {
        self.root.join(format!("{run_id}.{ARCHIVE_EXTENSION}"))
    }

    pub fn retention_lock_path(&self) -> PathBuf {
        self.root.join(RETENTION_LOCK_FILE_NAME)
    }
}

pub fn bootstrap_runs_root(paths: &RunsPaths) -> Result<(), RuntimeError> {
    fs::create_dir_all(&paths.root).map_err(|source| RuntimeError::CreateDir {
        path: paths.root.display().to_string(),
        source,
    })
}
