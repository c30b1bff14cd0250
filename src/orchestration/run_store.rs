use crate::orchestration::error::OrchestratorError;
use crate::runtime::state_paths::RunsPaths;
use crate::shared::{atomic_write_file, RunId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Pending, RunStatus::Failed)
                | (RunStatus::Pending, RunStatus::Cancelled)
                | (RunStatus::Running, RunStatus::Completed)
                | (RunStatus::Running, RunStatus::Failed)
                | (RunStatus::Running, RunStatus::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
            RunStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The generation request as submitted. Unknown request fields are kept in
/// `extra` so the record preserves the raw input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInputs {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunInputs {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.prompt.trim().is_empty() {
            return Err(OrchestratorError::MissingPrompt);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    pub kind: String,
    pub storage_path: String,
    pub access_url: String,
    #[serde(default)]
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub status: RunStatus,
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub finished_at: Option<i64>,
    pub inputs: RunInputs,
    #[serde(default)]
    pub external_job_handle: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactRecord>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RunRecord {
    /// Moves the run forward. `finished_at` is stamped on the first entry
    /// into a terminal state and never rewritten.
    pub fn transition(&mut self, next: RunStatus, now: i64) -> Result<(), OrchestratorError> {
        if !self.status.can_transition_to(next) {
            return Err(OrchestratorError::InvalidRunTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        if next.is_terminal() && self.finished_at.is_none() {
            self.finished_at = Some(now);
        }
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.to_string(),
            prompt: self.inputs.prompt.clone(),
            status: self.status,
            created_at: self.created_at,
            finished_at: self.finished_at,
            duration_secs: self
                .finished_at
                .map(|finished| finished.saturating_sub(self.created_at)),
            artifact_count: self.artifacts.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub prompt: String,
    pub status: RunStatus,
    pub created_at: i64,
    pub finished_at: Option<i64>,
    pub duration_secs: Option<i64>,
    pub artifact_count: usize,
}

/// One directory per run holding a JSON record. Every operation goes back
/// to disk; nothing is cached between calls and writers are not serialized.
#[derive(Debug, Clone)]
pub struct RunStore {
    paths: RunsPaths,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            paths: RunsPaths::new(root),
        }
    }

    pub fn paths(&self) -> &RunsPaths {
        &self.paths
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.paths.run_dir(run_id)
    }

    pub fn archive_path(&self, run_id: &str) -> PathBuf {
        self.paths.archive_path(run_id)
    }

    pub fn exists(&self, run_id: &str) -> bool {
        self.paths.run_dir(run_id).is_dir()
    }

    pub fn create(
        &self,
        run_id: &RunId,
        inputs: RunInputs,
        now: i64,
    ) -> Result<RunRecord, OrchestratorError> {
        let root = self.paths.root();
        fs::create_dir_all(root).map_err(|e| io_error(root, e))?;
        let run_dir = self.paths.run_dir(run_id.as_str());
        match fs::create_dir(&run_dir) {
            Ok(()) => {}
            Err(source) if source.kind() == ErrorKind::AlreadyExists => {
                return Err(OrchestratorError::RunExists {
                    run_id: run_id.to_string(),
                })
            }
            Err(source) => return Err(io_error(&run_dir, source)),
        }

        let run = RunRecord {
            run_id: run_id.clone(),
            status: RunStatus::Pending,
            created_at: now,
            updated_at: now,
            finished_at: None,
            inputs,
            external_job_handle: None,
            artifacts: Vec::new(),
            error: None,
        };
        if let Err(err) = self.persist(&run) {
            let _ = fs::remove_dir_all(&run_dir);
            return Err(err);
        }
        Ok(run)
    }

    /// Loads the record stored under `run_id`. A record whose own `run_id`
    /// disagrees with its directory is reported as corrupt.
    pub fn read(&self, run_id: &str) -> Result<RunRecord, OrchestratorError> {
        let run_id = parse_run_id(run_id)?;
        let path = self.paths.record_path(run_id.as_str());
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                return Err(OrchestratorError::RunNotFound {
                    run_id: run_id.into_string(),
                })
            }
            Err(source) => return Err(io_error(&path, source)),
        };
        let corrupt = |source| OrchestratorError::CorruptRecord {
            run_id: run_id.to_string(),
            path: path.display().to_string(),
            source,
        };
        let run: RunRecord = serde_json::from_str(&raw).map_err(corrupt)?;
        if run.run_id != run_id {
            return Err(corrupt(serde::de::Error::custom(format!(
                "record names run `{}` but is stored under `{}`",
                run.run_id, run_id
            ))));
        }
        Ok(run)
    }

    pub fn persist(&self, run: &RunRecord) -> Result<(), OrchestratorError> {
        let path = self.paths.record_path(run.run_id.as_str());
        let body = serde_json::to_vec_pretty(run).map_err(|e| json_error(&path, e))?;
        atomic_write_file(&path, &body).map_err(|e| io_error(&path, e))
    }

    /// Read-modify-write of one record. The record is only rewritten when
    /// `mutate` actually changed it, and always under `run_id`.
    pub fn update<F>(&self, run_id: &str, mutate: F) -> Result<RunRecord, OrchestratorError>
    where
        F: FnOnce(&mut RunRecord) -> Result<(), OrchestratorError>,
    {
        let original = self.read(run_id)?;
        let mut run = original.clone();
        mutate(&mut run)?;
        run.run_id = original.run_id.clone();
        if run != original {
            self.persist(&run)?;
        }
        Ok(run)
    }

    /// Summaries of every readable run, newest first. Unreadable records are
    /// logged and skipped.
    pub fn list(&self) -> Result<Vec<RunSummary>, OrchestratorError> {
        let root = self.paths.root();
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_error(root, source)),
        };

        let mut runs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| io_error(root, source))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|value| value.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            match self.read(name) {
                Ok(run) => runs.push(run.summary()),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable run record");
                }
            }
        }

        runs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        Ok(runs)
    }

    /// Removes the run directory and its archive. Returns whether anything
    /// was there to remove.
    pub fn delete(&self, run_id: &str) -> Result<bool, OrchestratorError> {
        let run_id = parse_run_id(run_id)?;
        let mut removed = false;

        let run_dir = self.paths.run_dir(run_id.as_str());
        match fs::remove_dir_all(&run_dir) {
            Ok(()) => removed = true,
            Err(source) if source.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(io_error(&run_dir, source)),
        }

        let archive = self.paths.archive_path(run_id.as_str());
        match fs::remove_file(&archive) {
            Ok(()) => removed = true,
            Err(source) if source.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(io_error(&archive, source)),
        }
        Ok(removed)
    }
}

pub(crate) fn parse_run_id(raw: &str) -> Result<RunId, OrchestratorError> {
    RunId::parse(raw).map_err(|reason| OrchestratorError::InvalidRunId {
        run_id: raw.to_string(),
        reason,
    })
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> OrchestratorError {
    OrchestratorError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn json_error(path: &Path, source: serde_json::Error) -> OrchestratorError {
    OrchestratorError::Json {
        path: path.display().to_string(),
        source,
    }
}
