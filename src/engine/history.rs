//! Interpretation of `GET /history/{job_handle}` payloads.
//!
//! The engine answers with `{}` while a job is pending. Once it finishes the
//! payload is either a flat `{"outputs": {...}}` document or a map keyed by
//! job handle whose entries each carry their own `outputs`. Both shapes are
//! accepted everywhere in this module.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Output keys whose entries describe downloadable images.
const IMAGE_OUTPUT_KEYS: &[&str] = &["images"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default = "default_artifact_kind")]
    pub kind: String,
}

fn default_artifact_kind() -> String {
    "output".to_string()
}

/// A history payload counts as terminal once it is a non-empty object.
pub fn is_terminal(history: &Value) -> bool {
    history.as_object().is_some_and(|map| !map.is_empty())
}

/// Every `outputs` map in the payload, in document order.
fn output_maps(result: &Value) -> Vec<&Map<String, Value>> {
    let Some(root) = result.as_object() else {
        return Vec::new();
    };
    if let Some(outputs) = root.get("outputs").and_then(Value::as_object) {
        return vec![outputs];
    }
    root.values()
        .filter_map(|entry| entry.get("outputs").and_then(Value::as_object))
        .collect()
}

/// Collects every image descriptor across all output nodes, in node order.
/// Entries without a `filename` are skipped.
pub fn extract_artifacts(result: &Value) -> Vec<ArtifactDescriptor> {
    let mut artifacts = Vec::new();
    for outputs in output_maps(result) {
        for node_output in outputs.values() {
            for key in IMAGE_OUTPUT_KEYS {
                let Some(entries) = node_output.get(*key).and_then(Value::as_array) else {
                    continue;
                };
                artifacts.extend(entries.iter().filter_map(|entry| {
                    serde_json::from_value::<ArtifactDescriptor>(entry.clone())
                        .ok()
                        .filter(|descriptor| !descriptor.filename.trim().is_empty())
                }));
            }
        }
    }
    artifacts
}

/// Engine-side failure reported inside a terminal payload, if any.
pub fn reported_failure(result: &Value) -> Option<String> {
    let Some(root) = result.as_object() else {
        return None;
    };
    let mut statuses = Vec::new();
    if let Some(status) = root.get("status") {
        statuses.push(status);
    }
    statuses.extend(root.values().filter_map(|entry| entry.get("status")));

    statuses.into_iter().find_map(|status| {
        let status_str = status.get("status_str").and_then(Value::as_str)?;
        if status_str != "error" {
            return None;
        }
        let detail = status
            .get("messages")
            .and_then(Value::as_array)
            .and_then(|messages| {
                messages.iter().find_map(|message| {
                    let kind = message.get(0).and_then(Value::as_str)?;
                    if kind != "execution_error" {
                        return None;
                    }
                    message
                        .get(1)
                        .and_then(|body| body.get("exception_message"))
                        .and_then(Value::as_str)
                        .map(|text| text.trim().to_string())
                })
            });
        Some(match detail {
            Some(text) if !text.is_empty() => format!("engine reported error: {text}"),
            _ => "engine reported status `error`".to_string(),
        })
    })
}
