use super::history::ArtifactDescriptor;
use super::{EngineError, GenerationEngine};
use serde_json::{json, Map, Value};

pub const OFFLINE_HANDLE_PREFIX: &str = "offline-";
pub const OFFLINE_NODE_ID: &str = "offline";

/// 1x1 transparent PNG served for every offline artifact.
pub const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Engine stand-in for `test` mode. Never touches the network; every job
/// completes immediately with a single placeholder image.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineEngine;

impl OfflineEngine {
    fn artifact_name(job_handle: &str) -> String {
        let stem = job_handle
            .strip_prefix(OFFLINE_HANDLE_PREFIX)
            .unwrap_or(job_handle);
        format!("{stem}_00001_.png")
    }
}

impl GenerationEngine for OfflineEngine {
    fn submit(&self, _graph: &Map<String, Value>, client_id: &str) -> Result<String, EngineError> {
        Ok(format!("{OFFLINE_HANDLE_PREFIX}{client_id}"))
    }

    fn history(&self, job_handle: &str) -> Result<Value, EngineError> {
        let mut root = Map::new();
        root.insert(
            job_handle.to_string(),
            json!({
                "outputs": {
                    OFFLINE_NODE_ID: {
                        "images": [{
                            "filename": Self::artifact_name(job_handle),
                            "subfolder": "",
                            "type": "output",
                        }]
                    }
                },
                "status": {"status_str": "success", "completed": true},
            }),
        );
        Ok(Value::Object(root))
    }

    fn fetch(&self, _artifact: &ArtifactDescriptor) -> Result<Vec<u8>, EngineError> {
        Ok(PLACEHOLDER_PNG.to_vec())
    }

    fn probe(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn is_offline(&self) -> bool {
        true
    }
}
