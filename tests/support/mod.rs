#![allow(dead_code)]

use adgen::engine::{ArtifactDescriptor, EngineError, GenerationEngine};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json_body(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body is json")
    }
}

pub struct MockResponse {
    pub status_line: &'static str,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn json(value: Value) -> Self {
        Self {
            status_line: "200 OK",
            content_type: "application/json",
            body: value.to_string().into_bytes(),
        }
    }

    pub fn bytes(body: &[u8]) -> Self {
        Self {
            status_line: "200 OK",
            content_type: "image/png",
            body: body.to_vec(),
        }
    }

    pub fn error(status_line: &'static str, body: &str) -> Self {
        Self {
            status_line,
            content_type: "text/plain",
            body: body.as_bytes().to_vec(),
        }
    }
}

pub struct MockEngineServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockEngineServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn requests_to(&self, prefix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path.starts_with(prefix))
            .collect()
    }
}

/// Serves every connection with `handler` until the test process exits.
pub fn spawn_engine_server<H>(handler: H) -> MockEngineServer
where
    H: Fn(&RecordedRequest) -> MockResponse + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                continue;
            };
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            let mut parts = request_line.split_whitespace();
            let method = parts.next().unwrap_or_default().to_string();
            let path = parts.next().unwrap_or_default().to_string();

            let mut content_length = 0_usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("read header line");
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
            }
            let mut body = vec![0_u8; content_length];
            reader.read_exact(&mut body).expect("read request body");

            let request = RecordedRequest {
                method,
                path,
                body: String::from_utf8_lossy(&body).to_string(),
            };
            let response = handler(&request);
            recorded.lock().expect("requests lock").push(request);

            let head = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                response.status_line,
                response.content_type,
                response.body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&response.body);
        }
    });

    MockEngineServer {
        base_url: format!("http://{addr}"),
        requests,
    }
}

/// A URL nothing is listening on.
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

pub fn sample_template() -> Value {
    json!({
        "3": {
            "class_type": "KSampler",
            "inputs": {"seed": 1, "steps": 20, "cfg": 7.0}
        },
        "6": {
            "class_type": "CLIPTextEncode",
            "inputs": {"text": "placeholder", "clip": ["4", 1]},
            "_meta": {"title": "Positive Prompt"}
        },
        "7": {
            "class_type": "CLIPTextEncode",
            "inputs": {"text": "blurry", "clip": ["4", 1]},
            "_meta": {"title": "Negative Prompt"}
        },
        "9": {
            "class_type": "SaveImage",
            "inputs": {"filename_prefix": "ComfyUI", "images": ["8", 0]}
        }
    })
}

pub fn history_with_images(job_handle: &str, images: Value) -> Value {
    let mut root = Map::new();
    root.insert(
        job_handle.to_string(),
        json!({
            "outputs": {"9": {"images": images}},
            "status": {"status_str": "success", "completed": true}
        }),
    );
    Value::Object(root)
}

/// In-memory engine that replays scripted history payloads.
pub struct ScriptedEngine {
    job_handle: String,
    submit_error: Option<String>,
    histories: Mutex<VecDeque<Value>>,
    artifact_body: Vec<u8>,
    submissions: Mutex<Vec<Map<String, Value>>>,
    history_calls: Mutex<usize>,
    fetches: Mutex<Vec<ArtifactDescriptor>>,
}

impl ScriptedEngine {
    /// `histories` are returned in order; the last one repeats forever.
    pub fn new(job_handle: &str, histories: Vec<Value>) -> Self {
        Self {
            job_handle: job_handle.to_string(),
            submit_error: None,
            histories: Mutex::new(histories.into()),
            artifact_body: b"png-bytes".to_vec(),
            submissions: Mutex::new(Vec::new()),
            history_calls: Mutex::new(0),
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_submit(reason: &str) -> Self {
        let mut engine = Self::new("unused", vec![json!({})]);
        engine.submit_error = Some(reason.to_string());
        engine
    }

    pub fn artifact_body(&self) -> &[u8] {
        &self.artifact_body
    }

    pub fn submissions(&self) -> Vec<Map<String, Value>> {
        self.submissions.lock().expect("submissions lock").clone()
    }

    pub fn history_calls(&self) -> usize {
        *self.history_calls.lock().expect("history lock")
    }

    pub fn fetches(&self) -> Vec<ArtifactDescriptor> {
        self.fetches.lock().expect("fetches lock").clone()
    }
}

impl GenerationEngine for ScriptedEngine {
    fn submit(&self, graph: &Map<String, Value>, _client_id: &str) -> Result<String, EngineError> {
        if let Some(reason) = &self.submit_error {
            return Err(EngineError::Request {
                url: "scripted://prompt".to_string(),
                reason: reason.clone(),
            });
        }
        self.submissions
            .lock()
            .expect("submissions lock")
            .push(graph.clone());
        Ok(self.job_handle.clone())
    }

    fn history(&self, _job_handle: &str) -> Result<Value, EngineError> {
        *self.history_calls.lock().expect("history lock") += 1;
        let mut histories = self.histories.lock().expect("histories lock");
        let next = if histories.len() > 1 {
            histories.pop_front()
        } else {
            histories.front().cloned()
        };
        Ok(next.unwrap_or_else(|| json!({})))
    }

    fn fetch(&self, artifact: &ArtifactDescriptor) -> Result<Vec<u8>, EngineError> {
        self.fetches
            .lock()
            .expect("fetches lock")
            .push(artifact.clone());
        Ok(self.artifact_body.clone())
    }

    fn probe(&self) -> Result<(), EngineError> {
        Ok(())
    }
}
