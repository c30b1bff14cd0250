pub mod client;
pub mod error;
pub mod history;
pub mod offline;
pub mod template;

pub use client::EngineClient;
pub use error::EngineError;
pub use history::{extract_artifacts, ArtifactDescriptor};
pub use offline::OfflineEngine;
pub use template::{classify_node, JobTemplate, NodeRole, PatchParams, TemplateError};

use crate::config::{EngineMode, Settings};
use crate::orchestration::polling::{poll_until, PollOutcome, PollPolicy};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The generation engine as seen by the run lifecycle.
pub trait GenerationEngine: Send + Sync {
    /// Submits a specialized job graph and returns the engine's job handle.
    fn submit(&self, graph: &Map<String, Value>, client_id: &str) -> Result<String, EngineError>;

    /// One history fetch. `{}` means the job is still pending.
    fn history(&self, job_handle: &str) -> Result<Value, EngineError>;

    /// History fetch that gives up once `budget` is spent. Engines without
    /// blocking I/O can ignore the budget.
    fn history_within(&self, job_handle: &str, budget: Duration) -> Result<Value, EngineError> {
        let _ = budget;
        self.history(job_handle)
    }

    fn fetch(&self, artifact: &ArtifactDescriptor) -> Result<Vec<u8>, EngineError>;

    /// Cheap reachability check used by health reporting.
    fn probe(&self) -> Result<(), EngineError>;

    fn is_offline(&self) -> bool {
        false
    }

    /// Fetches history every `policy.interval` until a terminal payload
    /// appears. `Ok(None)` means `should_stop` ended the wait; deadline
    /// expiry is [`EngineError::Timeout`], including a request that was
    /// still in flight when the deadline passed.
    fn poll(
        &self,
        job_handle: &str,
        policy: PollPolicy,
        should_stop: &mut dyn FnMut() -> bool,
    ) -> Result<Option<Value>, EngineError> {
        let started = Instant::now();
        let mut sent = 0_u32;
        let outcome = poll_until(policy, should_stop, |remaining| -> Result<_, EngineError> {
            sent = sent.saturating_add(1);
            let attempt_started = Instant::now();
            let history = match self.history_within(job_handle, remaining) {
                Ok(history) => history,
                Err(EngineError::Request { .. } | EngineError::MalformedResponse { .. })
                    if attempt_started.elapsed() >= remaining =>
                {
                    return Err(EngineError::Timeout {
                        job_handle: job_handle.to_string(),
                        waited_secs: started.elapsed().as_secs(),
                        attempts: sent,
                    });
                }
                Err(err) => return Err(err),
            };
            Ok(history::is_terminal(&history).then_some(history))
        })?;
        match outcome {
            PollOutcome::Ready(result) => Ok(Some(result)),
            PollOutcome::Stopped { .. } => Ok(None),
            PollOutcome::Expired { attempts, waited } => Err(EngineError::Timeout {
                job_handle: job_handle.to_string(),
                waited_secs: waited.as_secs(),
                attempts,
            }),
        }
    }
}

pub fn engine_from_settings(settings: &Settings) -> Arc<dyn GenerationEngine> {
    match settings.engine_mode {
        EngineMode::Api => Arc::new(EngineClient::new(settings.engine_url.clone())),
        EngineMode::Test => Arc::new(OfflineEngine),
    }
}
