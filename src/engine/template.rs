//! Job template loading and per-run specialization.
//!
//! A template is the engine's node graph: a map of node id to
//! `{"class_type": ..., "inputs": {...}, "_meta": {"title": ...}}`. It is
//! loaded once at startup and never mutated; [`JobTemplate::patch`] always
//! works on a deep copy.
//!
//! Node classification rules:
//! - a node whose `class_type` contains `TextEncode` is a text node; it is a
//!   *negative* text node when its `_meta.title` or its node id contains
//!   `negative` (case-insensitive), otherwise *positive*;
//! - a node whose `class_type` starts with `Save` writes output files;
//! - a node whose `class_type` contains `Sampler` and that has a `seed` or
//!   `noise_seed` input is a seeded sampler.

use crate::config::ConfigError;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

pub const NEGATIVE_MARKER: &str = "negative";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    PositiveText,
    NegativeText,
    Output,
    Sampler,
    Other,
}

impl NodeRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PositiveText => "positive text encoder",
            Self::NegativeText => "negative text encoder",
            Self::Output => "output writer",
            Self::Sampler => "sampler",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("job template has no {role} node")]
    MissingNodeRole { role: &'static str },
    #[error("job template node `{node_id}` is not an object")]
    MalformedNode { node_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchParams<'a> {
    pub run_id: &'a str,
    pub prompt: &'a str,
    pub negative_prompt: Option<&'a str>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobTemplate {
    nodes: Map<String, Value>,
}

impl JobTemplate {
    pub fn from_value(value: Value) -> Result<Self, TemplateError> {
        let Value::Object(nodes) = value else {
            return Err(TemplateError::MalformedNode {
                node_id: "<root>".to_string(),
            });
        };
        let template = Self { nodes };
        template.validate()?;
        Ok(template)
    }

    /// Reads and validates the template file. Any failure here is fatal for
    /// the process.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::TemplateRead {
            path: path.display().to_string(),
            source,
        })?;
        let value: Value =
            serde_json::from_str(&raw).map_err(|source| ConfigError::TemplateParse {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_value(value).map_err(|err| ConfigError::TemplateInvalid {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
    }

    pub fn nodes(&self) -> &Map<String, Value> {
        &self.nodes
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        let mut has_positive = false;
        let mut has_output = false;
        for (node_id, node) in &self.nodes {
            if !node.is_object() {
                return Err(TemplateError::MalformedNode {
                    node_id: node_id.clone(),
                });
            }
            match classify_node(node_id, node) {
                NodeRole::PositiveText => has_positive = true,
                NodeRole::Output => has_output = true,
                _ => {}
            }
        }
        if !has_positive {
            return Err(TemplateError::MissingNodeRole {
                role: NodeRole::PositiveText.as_str(),
            });
        }
        if !has_output {
            return Err(TemplateError::MissingNodeRole {
                role: NodeRole::Output.as_str(),
            });
        }
        Ok(())
    }

    /// Returns an independent copy of the graph specialized for one run.
    pub fn patch(&self, params: &PatchParams<'_>) -> Result<Map<String, Value>, TemplateError> {
        self.validate()?;
        let mut graph = self.nodes.clone();
        for (node_id, node) in graph.iter_mut() {
            let role = classify_node(node_id, node);
            if role == NodeRole::Other {
                continue;
            }
            let Some(inputs) = node_inputs_mut(node) else {
                continue;
            };
            match role {
                NodeRole::PositiveText => {
                    let field = text_field(inputs);
                    inputs.insert(field.to_string(), Value::from(params.prompt));
                }
                NodeRole::NegativeText => {
                    if let Some(negative) = params.negative_prompt {
                        let field = text_field(inputs);
                        inputs.insert(field.to_string(), Value::from(negative));
                    }
                }
                NodeRole::Output => {
                    inputs.insert("filename_prefix".to_string(), Value::from(params.run_id));
                }
                NodeRole::Sampler => {
                    if let Some(seed) = params.seed {
                        let field = if inputs.contains_key("noise_seed") {
                            "noise_seed"
                        } else {
                            "seed"
                        };
                        inputs.insert(field.to_string(), Value::from(seed));
                    }
                }
                NodeRole::Other => {}
            }
        }
        Ok(graph)
    }
}

pub fn classify_node(node_id: &str, node: &Value) -> NodeRole {
    let class_type = node
        .get("class_type")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if class_type.contains("TextEncode") {
        let title = node
            .get("_meta")
            .and_then(|meta| meta.get("title"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if is_negative_label(title) || is_negative_label(node_id) {
            return NodeRole::NegativeText;
        }
        return NodeRole::PositiveText;
    }
    if class_type.starts_with("Save") {
        return NodeRole::Output;
    }
    if class_type.contains("Sampler") {
        let seeded = node
            .get("inputs")
            .and_then(Value::as_object)
            .is_some_and(|inputs| inputs.contains_key("seed") || inputs.contains_key("noise_seed"));
        if seeded {
            return NodeRole::Sampler;
        }
    }
    NodeRole::Other
}

fn is_negative_label(label: &str) -> bool {
    label.to_ascii_lowercase().contains(NEGATIVE_MARKER)
}

fn node_inputs_mut(node: &mut Value) -> Option<&mut Map<String, Value>> {
    let node = node.as_object_mut()?;
    node.entry("inputs")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
}

fn text_field(inputs: &Map<String, Value>) -> &'static str {
    if !inputs.contains_key("text") && inputs.contains_key("prompt") {
        "prompt"
    } else {
        "text"
    }
}
