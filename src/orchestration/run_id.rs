//! Normalization of the identifier shapes callers hand to run operations.

use crate::orchestration::error::OrchestratorError;
use crate::orchestration::run_store::parse_run_id;
use crate::shared::RunId;
use serde_json::{Map, Value};

/// Keys probed, in order, for an id at one level of a structured result.
const ID_KEYS: &[&str] = &["run_id", "id"];
/// Keys under which a nested result may carry the id one level down.
const NESTED_KEYS: &[&str] = &["detail", "result", "data"];

#[derive(Debug, Clone, PartialEq)]
pub enum RunIdInput {
    Absent,
    Raw(String),
    Structured(Value),
}

impl From<&str> for RunIdInput {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<String> for RunIdInput {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl From<&String> for RunIdInput {
    fn from(value: &String) -> Self {
        Self::Raw(value.clone())
    }
}

impl From<&RunId> for RunIdInput {
    fn from(value: &RunId) -> Self {
        Self::Raw(value.as_str().to_string())
    }
}

impl From<Value> for RunIdInput {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

impl From<Option<String>> for RunIdInput {
    fn from(value: Option<String>) -> Self {
        value.map(Self::Raw).unwrap_or(Self::Absent)
    }
}

/// Resolves any accepted shape to a canonical id, minting a fresh one when
/// the input carries none. Present-but-unsafe ids are rejected, never
/// replaced. Resolving an already canonical id returns it unchanged.
pub fn resolve_run_id(input: &RunIdInput) -> Result<RunId, OrchestratorError> {
    match input {
        RunIdInput::Absent => mint(),
        RunIdInput::Raw(raw) => resolve_raw(raw),
        RunIdInput::Structured(value) => match value {
            Value::Null => mint(),
            Value::String(raw) => resolve_raw(raw),
            Value::Number(number) => resolve_raw(&number.to_string()),
            Value::Object(map) => match find_id(map) {
                Some(raw) => resolve_raw(&raw),
                None => mint(),
            },
            Value::Bool(_) | Value::Array(_) => mint(),
        },
    }
}

fn resolve_raw(raw: &str) -> Result<RunId, OrchestratorError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return mint();
    }
    parse_run_id(trimmed)
}

fn mint() -> Result<RunId, OrchestratorError> {
    RunId::mint().map_err(OrchestratorError::IdGeneration)
}

fn find_id(map: &Map<String, Value>) -> Option<String> {
    id_at_level(map).or_else(|| {
        NESTED_KEYS
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_object))
            .find_map(id_at_level)
    })
}

fn id_at_level(map: &Map<String, Value>) -> Option<String> {
    ID_KEYS.iter().find_map(|key| match map.get(*key)? {
        Value::String(raw) if !raw.trim().is_empty() => Some(raw.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}
