pub mod archive;
pub mod error;
pub mod lifecycle;
pub mod polling;
pub mod run_id;
pub mod run_store;

pub use error::OrchestratorError;
pub use lifecycle::RunOrchestrator;
pub use polling::{poll_until, PollOutcome, PollPolicy};
pub use run_id::{resolve_run_id, RunIdInput};
pub use run_store::{ArtifactRecord, RunInputs, RunRecord, RunStatus, RunStore, RunSummary};
