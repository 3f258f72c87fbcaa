//! Summarization strategies
//!
//! A [`Summarizer`] condenses text into shorter text. The summarization
//! engine delegates to one; truncation and windowing are the strategy's
//! business.

pub mod prompts;
pub mod provider;
pub mod remote;
pub mod types;

use std::sync::Arc;

use tracing::warn;

use crate::config::SummarizerConfig;

pub use provider::{DisabledSummarizer, Summarizer};
pub use remote::RemoteSummarizer;
pub use types::SummarizerError;

/// The remote summarizer described by `config`, or a disabled one if it
/// cannot be built
pub fn from_config(config: &SummarizerConfig) -> Arc<dyn Summarizer> {
    match RemoteSummarizer::new(config) {
        Ok(remote) => Arc::new(remote),
        Err(e) => {
            warn!("Summarizer unavailable: {}", e);
            Arc::new(DisabledSummarizer::new(e.to_string()))
        }
    }
}
