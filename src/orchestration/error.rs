use crate::engine::{EngineError, TemplateError};
use crate::orchestration::run_store::RunStatus;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("invalid run id `{run_id}`: {reason}")]
    InvalidRunId { run_id: String, reason: String },
    #[error("run request is missing a prompt")]
    MissingPrompt,
    #[error("failed to mint run id: {0}")]
    IdGeneration(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("run `{run_id}` not found")]
    RunNotFound { run_id: String },
    #[error("run `{run_id}` already exists")]
    RunExists { run_id: String },
    #[error("run `{run_id}` record at {path} is corrupt: {source}")]
    CorruptRecord {
        run_id: String,
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("run state transition `{from}` -> `{to}` is invalid")]
    InvalidRunTransition { from: RunStatus, to: RunStatus },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to build archive {path}: {reason}")]
    Archive { path: String, reason: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl OrchestratorError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RunNotFound { .. })
    }

    /// Errors raised before any state is mutated because the request itself
    /// is unusable.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidRunId { .. } | Self::MissingPrompt | Self::Template(_)
        )
    }
}
