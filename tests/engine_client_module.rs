mod support;

use adgen::engine::{ArtifactDescriptor, EngineClient, EngineError, GenerationEngine};
use adgen::orchestration::PollPolicy;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use support::{spawn_engine_server, unreachable_url, MockResponse};

fn fast_policy(deadline_ms: u64) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        deadline: Duration::from_millis(deadline_ms),
    }
}

fn graph() -> Map<String, Value> {
    json!({"9": {"class_type": "SaveImage", "inputs": {"filename_prefix": "r1"}}})
        .as_object()
        .cloned()
        .expect("graph object")
}

#[test]
fn engine_client_submit_posts_graph_and_returns_prompt_id() {
    let server = spawn_engine_server(|_| MockResponse::json(json!({"prompt_id": "h1", "number": 3})));
    let client = EngineClient::new(format!("{}/", server.base_url));

    let handle = client.submit(&graph(), "r1").expect("submit");
    assert_eq!(handle, "h1");

    let requests = server.requests_to("/prompt");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    let body = requests[0].json_body();
    assert_eq!(body["client_id"], "r1");
    assert_eq!(body["prompt"]["9"]["inputs"]["filename_prefix"], "r1");
}

#[test]
fn engine_client_submit_without_prompt_id_is_an_error() {
    let server = spawn_engine_server(|_| MockResponse::json(json!({"number": 3})));
    let client = EngineClient::new(server.base_url.clone());

    let err = client.submit(&graph(), "r1").expect_err("missing handle");
    assert!(matches!(err, EngineError::MissingJobHandle { .. }), "{err}");
}

#[test]
fn engine_client_maps_error_statuses_with_body() {
    let server = spawn_engine_server(|_| {
        MockResponse::error("500 Internal Server Error", "node 9 exploded")
    });
    let client = EngineClient::new(server.base_url.clone());

    let err = client.submit(&graph(), "r1").expect_err("status error");
    match err {
        EngineError::Status { status, body, .. } => {
            assert_eq!(status, 500);
            assert!(body.contains("node 9 exploded"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn engine_client_unreachable_engine_is_a_request_error() {
    let client = EngineClient::new(unreachable_url());
    let err = client.submit(&graph(), "r1").expect_err("connection refused");
    assert!(matches!(err, EngineError::Request { .. }), "{err}");
    assert!(client.probe().is_err());
}

#[test]
fn engine_client_poll_waits_until_history_is_populated() {
    let polls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&polls);
    let server = spawn_engine_server(move |request| {
        assert_eq!(request.path, "/history/h1");
        if seen.fetch_add(1, Ordering::SeqCst) < 2 {
            MockResponse::json(json!({}))
        } else {
            MockResponse::json(json!({"h1": {"outputs": {}}}))
        }
    });
    let client = EngineClient::new(server.base_url.clone());

    let result = client
        .poll("h1", fast_policy(5_000), &mut || false)
        .expect("poll")
        .expect("result before deadline");
    assert!(result.get("h1").is_some());
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[test]
fn engine_client_poll_times_out_at_the_deadline() {
    let server = spawn_engine_server(|_| MockResponse::json(json!({})));
    let client = EngineClient::new(server.base_url.clone());

    let err = client
        .poll("h1", fast_policy(60), &mut || false)
        .expect_err("deadline");
    assert!(err.is_timeout(), "{err}");
    assert!(err.to_string().contains("h1"));
}

#[test]
fn engine_client_poll_deadline_cuts_off_a_stalled_history_request() {
    let server = spawn_engine_server(|_| {
        thread::sleep(Duration::from_secs(3));
        MockResponse::json(json!({}))
    });
    let client = EngineClient::new(server.base_url.clone());

    let started = Instant::now();
    let err = client
        .poll("h1", fast_policy(300), &mut || false)
        .expect_err("deadline");
    assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
    match err {
        EngineError::Timeout { job_handle, attempts, .. } => {
            assert_eq!(job_handle, "h1");
            assert_eq!(attempts, 1);
        }
        other => panic!("expected timeout, got {other}"),
    }
}

#[test]
fn engine_client_poll_stops_when_asked() {
    let server = spawn_engine_server(|_| MockResponse::json(json!({})));
    let client = EngineClient::new(server.base_url.clone());

    let outcome = client
        .poll("h1", fast_policy(5_000), &mut || true)
        .expect("poll");
    assert!(outcome.is_none());
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn engine_client_fetch_passes_descriptor_as_query() {
    let server = spawn_engine_server(|_| MockResponse::bytes(b"\x89PNG-data"));
    let client = EngineClient::new(server.base_url.clone());

    let bytes = client
        .fetch(&ArtifactDescriptor {
            filename: "out 1.png".to_string(),
            subfolder: "batch".to_string(),
            kind: "output".to_string(),
        })
        .expect("fetch");
    assert_eq!(bytes, b"\x89PNG-data");

    let requests = server.requests_to("/view");
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].path,
        "/view?filename=out%201.png&subfolder=batch&type=output"
    );
}

#[test]
fn engine_client_probe_hits_the_root() {
    let server = spawn_engine_server(|_| MockResponse::json(json!({})));
    let client = EngineClient::new(server.base_url.clone());
    client.probe().expect("probe");
    assert_eq!(server.requests()[0].path, "/");
}
