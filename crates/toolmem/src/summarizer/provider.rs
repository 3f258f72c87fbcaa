//! Summarizer trait
//!
//! Abstracts the summarization backend (remote LLM API, local model, test
//! doubles).

use async_trait::async_trait;

use crate::summarizer::types::SummarizerError;

/// Trait for summarization strategies
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Condense `text`.
    ///
    /// Fails with [`SummarizerError::UpstreamUnavailable`] when the backend
    /// cannot be reached; retries, if any, happen inside the implementation.
    async fn summarize(&self, text: &str) -> Result<String, SummarizerError>;

    /// Summarizer name for logging
    fn name(&self) -> &'static str;
}

/// Stand-in used when no summarization backend is configured.
///
/// Every call fails with [`SummarizerError::Config`] carrying the reason, so
/// storing and searching keep working without a model.
#[derive(Debug, Clone)]
pub struct DisabledSummarizer {
    reason: String,
}

impl DisabledSummarizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _text: &str) -> Result<String, SummarizerError> {
        Err(SummarizerError::Config(format!(
            "summarization is disabled: {}",
            self.reason
        )))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
