//! Artifact types
//!
//! Artifacts are the immutable units of content that flow between tools,
//! the store, and the reasoning process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// An immutable unit of content: text plus an optional structured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique identifier for this artifact
    pub id: Uuid,
    /// Stable type tag
    pub kind: ArtifactKind,
    /// Optional human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Text payload, used for embedding and for display
    pub text: String,
    /// Optional structured payload carried alongside the text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// When this artifact was created
    pub created_at: DateTime<Utc>,
}

/// Type tag of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Regular content produced by a tool or an engine
    Text,
    /// Informational sentinel, e.g. "no data found"
    Info,
}

impl Artifact {
    fn with_kind(kind: ArtifactKind, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: None,
            text,
            value: None,
            created_at: Utc::now(),
        }
    }

    /// Create a text artifact
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_kind(ArtifactKind::Text, text.into())
    }

    /// Create an informational artifact signalling a normal "no data" outcome
    pub fn info(text: impl Into<String>) -> Self {
        Self::with_kind(ArtifactKind::Info, text.into())
    }

    /// Create a text artifact carrying a structured value.
    ///
    /// The text is the compact JSON rendering of the value so that it can be
    /// embedded and searched like any other artifact.
    pub fn json(value: Value) -> Self {
        let mut artifact = Self::text(value.to_string());
        artifact.value = Some(value);
        artifact
    }

    /// Attach a name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a structured value, keeping the existing text
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn is_info(&self) -> bool {
        self.kind == ArtifactKind::Info
    }

    /// Length of the text payload in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether two artifacts carry the same payload, ignoring identity and timestamps
    pub fn same_content(&self, other: &Artifact) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.text == other.text
            && self.value == other.value
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Artifact {
    fn from(text: &str) -> Self {
        Artifact::text(text)
    }
}

impl From<String> for Artifact {
    fn from(text: String) -> Self {
        Artifact::text(text)
    }
}
