use super::history::ArtifactDescriptor;
use super::{EngineError, GenerationEngine};
use serde_json::{json, Map, Value};
use std::io::Read;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for the generation engine's `/prompt`, `/history` and
/// `/view` endpoints.
#[derive(Debug, Clone)]
pub struct EngineClient {
    base_url: String,
    agent: ureq::Agent,
}

impl EngineClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("adgen/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get_json(&self, url: &str, timeout: Duration) -> Result<Value, EngineError> {
        let response = self
            .agent
            .get(url)
            .timeout(timeout)
            .call()
            .map_err(|err| call_error(url, err))?;
        response
            .into_json::<Value>()
            .map_err(|err| EngineError::MalformedResponse {
                url: url.to_string(),
                reason: err.to_string(),
            })
    }
}

impl GenerationEngine for EngineClient {
    fn submit(&self, graph: &Map<String, Value>, client_id: &str) -> Result<String, EngineError> {
        let url = self.endpoint("prompt");
        let body = json!({
            "prompt": graph,
            "client_id": client_id,
        });
        let response = self
            .agent
            .post(&url)
            .send_json(body)
            .map_err(|err| call_error(&url, err))?;
        let payload = response
            .into_json::<Value>()
            .map_err(|err| EngineError::MalformedResponse {
                url: url.clone(),
                reason: err.to_string(),
            })?;

        match payload.get("prompt_id") {
            Some(Value::String(handle)) if !handle.trim().is_empty() => Ok(handle.clone()),
            Some(Value::Number(handle)) => Ok(handle.to_string()),
            _ => Err(EngineError::MissingJobHandle { url }),
        }
    }

    fn history(&self, job_handle: &str) -> Result<Value, EngineError> {
        self.history_within(job_handle, REQUEST_TIMEOUT)
    }

    fn history_within(&self, job_handle: &str, budget: Duration) -> Result<Value, EngineError> {
        let url = self.endpoint(&format!("history/{}", urlencoding::encode(job_handle)));
        self.get_json(&url, budget.min(REQUEST_TIMEOUT))
    }

    fn fetch(&self, artifact: &ArtifactDescriptor) -> Result<Vec<u8>, EngineError> {
        let url = format!(
            "{}?filename={}&subfolder={}&type={}",
            self.endpoint("view"),
            urlencoding::encode(&artifact.filename),
            urlencoding::encode(&artifact.subfolder),
            urlencoding::encode(&artifact.kind),
        );
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|err| call_error(&url, err))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|err| EngineError::Request {
                url: url.clone(),
                reason: format!("failed reading artifact body: {err}"),
            })?;
        Ok(bytes)
    }

    fn probe(&self) -> Result<(), EngineError> {
        let url = self.endpoint("");
        let response = self
            .agent
            .get(&url)
            .timeout(Duration::from_secs(5))
            .call()
            .map_err(|err| call_error(&url, err))?;
        let status = response.status();
        if status != 200 {
            return Err(EngineError::Status {
                url,
                status,
                body: String::new(),
            });
        }
        Ok(())
    }
}

fn call_error(url: &str, err: ureq::Error) -> EngineError {
    match err {
        ureq::Error::Status(status, response) => EngineError::Status {
            url: url.to_string(),
            status,
            body: response.into_string().unwrap_or_default(),
        },
        other => EngineError::Request {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}
