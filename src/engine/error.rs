#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("engine returned status {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("engine response from {url} is malformed: {reason}")]
    MalformedResponse { url: String, reason: String },
    #[error("engine response from {url} is missing `prompt_id`")]
    MissingJobHandle { url: String },
    #[error("engine job `{job_handle}` failed: {reason}")]
    JobFailed { job_handle: String, reason: String },
    #[error("timed out waiting for engine job `{job_handle}` after {waited_secs}s ({attempts} polls)")]
    Timeout {
        job_handle: String,
        waited_secs: u64,
        attempts: u32,
    },
}

impl EngineError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
