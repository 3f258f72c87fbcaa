//! Error types for toolmem

use thiserror::Error;

use crate::summarizer::SummarizerError;

/// Main error type for tool memory operations
#[derive(Error, Debug)]
pub enum ToolMemoryError {
    /// Vector store driver could not complete an upsert, query or load
    #[error("Storage error: {0}")]
    Storage(String),

    /// Embedding provider failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Summarization strategy failed or returned an unusable result
    #[error("Summarization error: {0}")]
    Summarization(#[from] SummarizerError),

    /// A search/summarize request is missing required keys or is not an object
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ToolMemoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for tool memory operations
pub type Result<T> = std::result::Result<T, ToolMemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ToolMemoryError::MalformedRequest("missing 'query'".to_string());
        assert_eq!(err.to_string(), "Malformed request: missing 'query'");

        let err = ToolMemoryError::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_summarizer_error_converts() {
        let err: ToolMemoryError = SummarizerError::UpstreamUnavailable("timeout".into()).into();
        assert!(matches!(
            err,
            ToolMemoryError::Summarization(SummarizerError::UpstreamUnavailable(_))
        ));
        assert_eq!(
            err.to_string(),
            "Summarization error: Upstream unavailable: timeout"
        );
    }
}
