//! The run lifecycle: create, start, finalize, cancel, list, get, delete.
//!
//! Failures that happen after a run exists (template, engine, timeout,
//! download, archive) are written into the run as `FAILED` and the record
//! is returned. Failures before a run exists, or that concern the request
//! itself, are returned as errors.

use crate::config::Settings;
use crate::engine::{
    engine_from_settings, extract_artifacts, ArtifactDescriptor, EngineError, GenerationEngine,
    JobTemplate, PatchParams,
};
use crate::engine::history::reported_failure;
use crate::orchestration::archive::build_run_archive;
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::polling::PollPolicy;
use crate::orchestration::run_id::{resolve_run_id, RunIdInput};
use crate::orchestration::run_store::{
    io_error, parse_run_id, ArtifactRecord, RunInputs, RunRecord, RunStatus, RunStore, RunSummary,
};
use crate::runtime::state_paths::RUN_RECORD_FILE_NAME;
use crate::shared::{atomic_write_file, now_secs, RunId};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MINT_MAX_ATTEMPTS: usize = 8;

pub struct RunOrchestrator {
    store: RunStore,
    engine: Arc<dyn GenerationEngine>,
    template: Arc<JobTemplate>,
    poll_policy: PollPolicy,
}

impl RunOrchestrator {
    pub fn new(
        store: RunStore,
        engine: Arc<dyn GenerationEngine>,
        template: Arc<JobTemplate>,
        poll_policy: PollPolicy,
    ) -> Self {
        Self {
            store,
            engine,
            template,
            poll_policy,
        }
    }

    pub fn from_settings(settings: &Settings, template: Arc<JobTemplate>) -> Self {
        Self::new(
            RunStore::new(settings.runs_dir.clone()),
            engine_from_settings(settings),
            template,
            settings.poll_policy(),
        )
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    pub fn engine(&self) -> &dyn GenerationEngine {
        self.engine.as_ref()
    }

    /// Persists a new `PENDING` run under a freshly minted id.
    pub fn create(&self, inputs: RunInputs) -> Result<RunRecord, OrchestratorError> {
        inputs.validate()?;
        for _ in 0..MINT_MAX_ATTEMPTS {
            let run_id = resolve_run_id(&RunIdInput::Absent)?;
            match self.store.create(&run_id, inputs.clone(), now_secs()) {
                Err(OrchestratorError::RunExists { .. }) => continue,
                created => return self.log_created(created),
            }
        }
        Err(OrchestratorError::IdGeneration(format!(
            "no unused run id after {MINT_MAX_ATTEMPTS} attempts"
        )))
    }

    /// Persists a new `PENDING` run under the id carried by `id`, minting one
    /// if it carries none.
    pub fn create_with_id(
        &self,
        id: impl Into<RunIdInput>,
        inputs: RunInputs,
    ) -> Result<RunRecord, OrchestratorError> {
        inputs.validate()?;
        let run_id = resolve_run_id(&id.into())?;
        let created = self.store.create(&run_id, inputs, now_secs());
        self.log_created(created)
    }

    fn log_created(
        &self,
        created: Result<RunRecord, OrchestratorError>,
    ) -> Result<RunRecord, OrchestratorError> {
        if let Ok(run) = &created {
            tracing::info!(run_id = %run.run_id, "run created");
        }
        created
    }

    /// `PENDING -> RUNNING`: specializes the template for this run and
    /// submits it. Runs that already left `PENDING` are returned unchanged.
    pub fn start(
        &self,
        id: impl Into<RunIdInput>,
        inputs: &RunInputs,
    ) -> Result<RunRecord, OrchestratorError> {
        inputs.validate()?;
        let run_id = resolve_run_id(&id.into())?;
        let run = self.store.read(run_id.as_str())?;
        if run.status != RunStatus::Pending {
            tracing::debug!(run_id = %run_id, status = %run.status, "start skipped");
            return Ok(run);
        }

        match self.submit(&run_id, inputs) {
            Ok(job_handle) => {
                tracing::info!(run_id = %run_id, job_handle = %job_handle, "run submitted");
                let inputs = inputs.clone();
                self.store.update(run_id.as_str(), move |run| {
                    if run.status != RunStatus::Pending {
                        return Ok(());
                    }
                    run.inputs = inputs;
                    run.external_job_handle = Some(job_handle);
                    run.transition(RunStatus::Running, now_secs())
                })
            }
            Err(err) => self.fail_run(run_id.as_str(), &err),
        }
    }

    /// Create followed by start. A start failure still yields the record.
    pub fn generate(&self, inputs: RunInputs) -> Result<RunRecord, OrchestratorError> {
        let run = self.create(inputs.clone())?;
        self.start(run.run_id.as_str(), &inputs)
    }

    fn submit(&self, run_id: &RunId, inputs: &RunInputs) -> Result<String, OrchestratorError> {
        let graph = self.template.patch(&PatchParams {
            run_id: run_id.as_str(),
            prompt: &inputs.prompt,
            negative_prompt: inputs.negative_prompt.as_deref(),
            seed: inputs.seed,
        })?;
        Ok(self.engine.submit(&graph, run_id.as_str())?)
    }

    /// Waits for the engine job, downloads its artifacts, archives the run
    /// directory, and records `COMPLETED`. Terminal runs are returned as-is.
    /// A run still `PENDING` is submitted first. The cached job handle is
    /// always reused; nothing is resubmitted after a poll failure.
    pub fn finalize(&self, id: impl Into<RunIdInput>) -> Result<RunRecord, OrchestratorError> {
        let run_id = resolve_run_id(&id.into())?;
        let run = self.store.read(run_id.as_str())?;
        if run.status.is_terminal() {
            return Ok(run);
        }

        let job_handle = match run.external_job_handle.clone() {
            Some(handle) => handle,
            None => {
                let started = self.start(run_id.as_str(), &run.inputs)?;
                match (&started.status, &started.external_job_handle) {
                    (RunStatus::Running, Some(handle)) => handle.clone(),
                    _ => return Ok(started),
                }
            }
        };

        let mut cancelled = || self.cancellation_requested(run_id.as_str());
        let result = match self.engine.poll(&job_handle, self.poll_policy, &mut cancelled) {
            Ok(Some(result)) => result,
            Ok(None) => {
                tracing::info!(run_id = %run_id, "finalize abandoned after cancellation");
                return self.store.read(run_id.as_str());
            }
            Err(err) => {
                if err.is_timeout() {
                    tracing::warn!(run_id = %run_id, job_handle = %job_handle, "engine poll timed out");
                }
                return self.fail_run(run_id.as_str(), &err.into());
            }
        };

        match self.collect_artifacts(&run_id, &job_handle, &result) {
            Ok(artifacts) => {
                tracing::info!(run_id = %run_id, artifacts = artifacts.len(), "run completed");
                self.store.update(run_id.as_str(), move |run| {
                    if run.status != RunStatus::Running {
                        return Ok(());
                    }
                    run.artifacts = artifacts;
                    run.error = None;
                    run.transition(RunStatus::Completed, now_secs())
                })
            }
            Err(err) => self.fail_run(run_id.as_str(), &err),
        }
    }

    fn cancellation_requested(&self, run_id: &str) -> bool {
        match self.store.read(run_id) {
            Ok(run) => run.status == RunStatus::Cancelled,
            Err(err) => err.is_not_found(),
        }
    }

    fn collect_artifacts(
        &self,
        run_id: &RunId,
        job_handle: &str,
        result: &Value,
    ) -> Result<Vec<ArtifactRecord>, OrchestratorError> {
        if let Some(reason) = reported_failure(result) {
            return Err(EngineError::JobFailed {
                job_handle: job_handle.to_string(),
                reason,
            }
            .into());
        }

        let run_dir = self.store.run_dir(run_id.as_str());
        let mut used_names = BTreeSet::new();
        let mut artifacts = Vec::new();
        for descriptor in extract_artifacts(result) {
            let local_name = local_artifact_name(&descriptor, &used_names);
            used_names.insert(local_name.clone());

            let bytes = self.engine.fetch(&descriptor)?;
            let storage_path = run_dir.join(&local_name);
            atomic_write_file(&storage_path, &bytes).map_err(|e| io_error(&storage_path, e))?;
            tracing::debug!(run_id = %run_id, file = %local_name, bytes = bytes.len(), "artifact stored");

            artifacts.push(ArtifactRecord {
                filename: descriptor.filename,
                subfolder: descriptor.subfolder,
                kind: descriptor.kind,
                storage_path: storage_path.display().to_string(),
                access_url: format!(
                    "/runs/{}/files/{}",
                    run_id,
                    urlencoding::encode(&local_name)
                ),
                size_bytes: bytes.len() as u64,
            });
        }

        let archive_path = self.store.archive_path(run_id.as_str());
        build_run_archive(&run_dir, &archive_path, &[RUN_RECORD_FILE_NAME])?;
        Ok(artifacts)
    }

    fn fail_run(
        &self,
        run_id: &str,
        err: &OrchestratorError,
    ) -> Result<RunRecord, OrchestratorError> {
        tracing::warn!(run_id = %run_id, error = %err, "run failed");
        let message = err.to_string();
        self.store.update(run_id, move |run| {
            if run.status.is_terminal() {
                return Ok(());
            }
            run.error = Some(message);
            run.transition(RunStatus::Failed, now_secs())
        })
    }

    /// `PENDING | RUNNING -> CANCELLED`. Terminal runs are returned unchanged.
    pub fn cancel(&self, id: impl Into<RunIdInput>) -> Result<RunRecord, OrchestratorError> {
        let run_id = resolve_run_id(&id.into())?;
        let run = self.store.update(run_id.as_str(), |run| {
            if run.status.is_terminal() {
                return Ok(());
            }
            run.transition(RunStatus::Cancelled, now_secs())
        })?;
        tracing::info!(run_id = %run_id, status = %run.status, "cancel requested");
        Ok(run)
    }

    pub fn list(&self) -> Result<Vec<RunSummary>, OrchestratorError> {
        self.store.list()
    }

    pub fn get(&self, run_id: &str) -> Result<RunRecord, OrchestratorError> {
        self.store.read(run_id)
    }

    pub fn delete(&self, run_id: &str) -> Result<(), OrchestratorError> {
        let run_id = parse_run_id(run_id)?;
        if !self.store.delete(run_id.as_str())? {
            return Err(OrchestratorError::RunNotFound {
                run_id: run_id.into_string(),
            });
        }
        tracing::info!(run_id = %run_id, "run deleted");
        Ok(())
    }

    /// Location of the run's archive, once finalize has produced it.
    pub fn archive(&self, run_id: &str) -> Result<PathBuf, OrchestratorError> {
        let run_id = parse_run_id(run_id)?;
        let path = self.store.archive_path(run_id.as_str());
        if !path.is_file() {
            return Err(OrchestratorError::RunNotFound {
                run_id: run_id.into_string(),
            });
        }
        Ok(path)
    }
}

/// File name an artifact is stored under inside the run directory. Strips
/// any directory part, folds the engine subfolder into the name, and keeps
/// names unique within one finalize.
fn local_artifact_name(descriptor: &ArtifactDescriptor, used: &BTreeSet<String>) -> String {
    let base = Path::new(&descriptor.filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("artifact");
    let subfolder = descriptor
        .subfolder
        .trim_matches(|ch: char| ch == '/' || ch == '\\')
        .replace(['/', '\\'], "-");

    let mut name = if subfolder.is_empty() {
        base.to_string()
    } else {
        format!("{subfolder}-{base}")
    };
    if name == RUN_RECORD_FILE_NAME || name.starts_with('.') {
        name = format!("artifact-{name}");
    }

    if !used.contains(&name) {
        return name;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{suffix}-{name}");
        if !used.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
