//! Inventory API access.
//!
//! Checks never talk HTTP themselves. They receive an [`ApiAccessor`] and ask
//! it for resources by id. Any `Fn(&str) -> Result<Value, ApiError>` closure
//! is an accessor, which keeps tests free of transport code; the binary
//! serves a captured inventory through [`SnapshotAccessor`].

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Inventory query failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("query for {resource} failed: {message}")]
    Transport { resource: String, message: String },

    #[error("invalid response for {resource}: {message}")]
    InvalidResponse { resource: String, message: String },
}

/// Capability to query the controller inventory
pub trait ApiAccessor: Send + Sync {
    /// Fetch a resource by id
    fn query(&self, resource: &str) -> Result<Value, ApiError>;
}

impl<F> ApiAccessor for F
where
    F: Fn(&str) -> Result<Value, ApiError> + Send + Sync,
{
    fn query(&self, resource: &str) -> Result<Value, ApiError> {
        self(resource)
    }
}

/// Accessor backed by a captured inventory snapshot.
///
/// The snapshot is a JSON object whose keys are resource ids.
#[derive(Debug, Clone, Default)]
pub struct SnapshotAccessor {
    resources: HashMap<String, Value>,
}

impl SnapshotAccessor {
    /// Build from an in-memory JSON document
    pub fn from_value(document: Value) -> Result<Self, ApiError> {
        match document {
            Value::Object(map) => Ok(SnapshotAccessor {
                resources: map.into_iter().collect(),
            }),
            other => Err(ApiError::InvalidResponse {
                resource: "<snapshot>".to_string(),
                message: format!("expected a JSON object, found {}", json_type(&other)),
            }),
        }
    }

    /// Load a snapshot file from disk
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let transport = |message: String| ApiError::Transport {
            resource: path.display().to_string(),
            message,
        };
        let content = fs::read_to_string(path).map_err(|e| transport(e.to_string()))?;
        let document: Value = serde_json::from_str(&content).map_err(|e| transport(e.to_string()))?;
        let accessor = Self::from_value(document)?;
        tracing::debug!(path = %path.display(), resources = accessor.len(), "loaded inventory snapshot");
        Ok(accessor)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl ApiAccessor for SnapshotAccessor {
    fn query(&self, resource: &str) -> Result<Value, ApiError> {
        self.resources
            .get(resource)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(resource.to_string()))
    }
}

/// Interpret a query response as a list of attribute objects.
pub fn attribute_rows<'a>(resource: &str, value: &'a Value) -> Result<Vec<&'a Map<String, Value>>, ApiError> {
    let invalid = |message: String| ApiError::InvalidResponse {
        resource: resource.to_string(),
        message,
    };
    let items = value
        .as_array()
        .ok_or_else(|| invalid(format!("expected an array, found {}", json_type(value))))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| invalid(format!("expected objects, found {}", json_type(item))))
        })
        .collect()
}

/// String attribute, or empty when absent or not a string
pub fn attr<'a>(row: &'a Map<String, Value>, key: &str) -> &'a str {
    row.get(key).and_then(Value::as_str).unwrap_or("")
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
