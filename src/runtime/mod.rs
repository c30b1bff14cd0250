use crate::config::ConfigError;

pub mod bootstrap;
pub mod exclusive_lock;
pub mod health;
pub mod retention;
pub mod state_paths;

pub use bootstrap::start_service;
pub use exclusive_lock::{try_acquire_exclusive_lock, ExclusiveLock, LockAttempt};
pub use health::{check_health, HealthReport};
pub use retention::{RetentionSweeper, SweepOutcome, SweepReport};
pub use state_paths::{
    bootstrap_runs_root, RunsPaths, ARCHIVE_EXTENSION, RETENTION_LOCK_FILE_NAME,
    RUN_RECORD_FILE_NAME,
};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to create runtime path {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open lock file {path}: {source}")]
    OpenLock {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to lock {path}: {source}")]
    Lock {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read metadata for {path}: {source}")]
    Metadata {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove {path}: {source}")]
    Remove {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}
