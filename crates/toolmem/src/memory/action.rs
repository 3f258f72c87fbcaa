//! Actions exposed to the reasoning process
//!
//! After storing a tool output the memory advertises two actions, each bound
//! to the new namespace. Requests arrive as JSON key/value payloads, either
//! flat or wrapped in a `"values"` object.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value, json};

use crate::error::{Result, ToolMemoryError};

pub const QUERY_KEY: &str = "query";
pub const NAMESPACE_KEY: &str = "artifact_namespace";
const VALUES_KEY: &str = "values";

/// Actions the memory can perform on a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryAction {
    /// Retrieve the parts of a namespace relevant to a query
    Search,
    /// Condense a whole namespace
    Summarize,
}

impl MemoryAction {
    pub const ALL: [MemoryAction; 2] = [MemoryAction::Search, MemoryAction::Summarize];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryAction::Search => "search",
            MemoryAction::Summarize => "summarize",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            MemoryAction::Search => "find the parts of the stored output relevant to a query",
            MemoryAction::Summarize => "get a condensed summary of the whole stored output",
        }
    }
}

impl fmt::Display for MemoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryAction {
    type Err = ToolMemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "search" => Ok(MemoryAction::Search),
            "summarize" => Ok(MemoryAction::Summarize),
            other => Err(ToolMemoryError::MalformedRequest(format!(
                "Unknown memory action: {other}"
            ))),
        }
    }
}

/// An action pre-bound to one namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub action: MemoryAction,
    pub namespace: String,
}

impl ActionDescriptor {
    pub fn new(action: MemoryAction, namespace: impl Into<String>) -> Self {
        Self {
            action,
            namespace: namespace.into(),
        }
    }

    /// Example payload with the namespace filled in
    pub fn payload(&self) -> Value {
        match self.action {
            MemoryAction::Search => json!({
                QUERY_KEY: "<natural language query>",
                NAMESPACE_KEY: self.namespace,
            }),
            MemoryAction::Summarize => json!({ NAMESPACE_KEY: self.namespace }),
        }
    }

    /// Build a request for this action; `query` is ignored for summarize
    pub fn request(&self, query: Option<&str>) -> ActionRequest {
        match (self.action, query) {
            (MemoryAction::Search, Some(query)) => ActionRequest::search(query, &self.namespace),
            (MemoryAction::Search, None) => {
                ActionRequest::new(json!({ NAMESPACE_KEY: self.namespace }))
            }
            (MemoryAction::Summarize, _) => ActionRequest::summarize(&self.namespace),
        }
    }

    /// One-line usage, as listed in stored-output descriptions
    pub fn usage(&self) -> String {
        format!(
            "{} {}: {}",
            self.action,
            self.payload(),
            self.action.description()
        )
    }
}

/// A structured key/value request for a memory action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest(Value);

impl ActionRequest {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn search(query: &str, namespace: &str) -> Self {
        Self(json!({ QUERY_KEY: query, NAMESPACE_KEY: namespace }))
    }

    pub fn summarize(namespace: &str) -> Self {
        Self(json!({ NAMESPACE_KEY: namespace }))
    }

    fn values(&self) -> Result<&Map<String, Value>> {
        let object = self.0.as_object().ok_or_else(|| {
            ToolMemoryError::MalformedRequest("request must be a JSON object".to_string())
        })?;

        match object.get(VALUES_KEY) {
            Some(Value::Object(values)) => Ok(values),
            Some(_) => Err(ToolMemoryError::MalformedRequest(format!(
                "'{VALUES_KEY}' must be an object"
            ))),
            None => Ok(object),
        }
    }

    /// Required non-blank string field
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.values()?.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
            Some(Value::String(_)) => Err(ToolMemoryError::MalformedRequest(format!(
                "'{key}' must not be empty"
            ))),
            Some(_) => Err(ToolMemoryError::MalformedRequest(format!(
                "'{key}' must be a string"
            ))),
            None => Err(ToolMemoryError::MalformedRequest(format!(
                "missing required key '{key}'"
            ))),
        }
    }
}

impl From<Value> for ActionRequest {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
