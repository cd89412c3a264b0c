//! Model Catalog
//!
//! Static catalog entries exposed at /v1/models. Pure data, never
//! mutated by request traffic.

use serde::{Deserialize, Serialize};

/// A catalog entry describing a model offered by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model identifier clients put in the `model` field
    pub id: String,

    /// Object type, conventionally "model"
    #[serde(default = "default_object")]
    pub object: String,

    /// Creation timestamp, 0 when unknown
    #[serde(default)]
    pub created: u64,

    /// Owning organization
    pub owned_by: String,

    /// Capability class (e.g. "chat.completions")
    #[serde(rename = "type")]
    pub model_type: String,

    /// Gateway path that serves this model
    pub endpoint: String,

    /// Nominal cost unit per request
    pub cost: u64,
}

fn default_object() -> String {
    "model".to_string()
}

/// The list envelope returned at /v1/models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelDescriptor>,
}

impl ModelList {
    pub fn new(data: Vec<ModelDescriptor>) -> Self {
        Self {
            object: "list".to_string(),
            data,
        }
    }
}
