use super::retention::RetentionSweeper;
use super::state_paths::{bootstrap_runs_root, RunsPaths};
use super::RuntimeError;
use crate::config::Settings;
use crate::engine::JobTemplate;
use crate::orchestration::RunOrchestrator;
use std::sync::Arc;

/// Process startup: prepares the runs root, loads the job template (fatal
/// on failure), runs the retention sweep once (never fatal), and builds the
/// orchestrator.
pub fn start_service(settings: &Settings) -> Result<RunOrchestrator, RuntimeError> {
    for line in settings.banner_lines() {
        tracing::info!("{line}");
    }

    bootstrap_runs_root(&RunsPaths::new(settings.runs_dir.clone()))?;
    let template = Arc::new(JobTemplate::load(&settings.graph_path)?);
    RetentionSweeper::from_settings(settings).run_at_startup();

    Ok(RunOrchestrator::from_settings(settings, template))
}
