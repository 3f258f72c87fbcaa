//! Summarization engine
//!
//! Collapses every artifact of a namespace into one condensed artifact.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::artifact::Artifact;
use crate::error::Result;
use crate::storage::ArtifactStore;
use crate::summarizer::{Summarizer, SummarizerError};

/// Separator placed between artifact texts before summarization
const ARTIFACT_SEPARATOR: &str = "\n\n";

pub struct SummaryEngine {
    store: Arc<ArtifactStore>,
    summarizer: Arc<dyn Summarizer>,
}

impl SummaryEngine {
    pub fn new(store: Arc<ArtifactStore>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { store, summarizer }
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Summarize all artifacts in `namespace`.
    ///
    /// An empty namespace yields an info artifact and the summarizer is not
    /// called. Summarizer failures, including a blank summary, are errors.
    pub async fn summarize(&self, namespace: &str) -> Result<Artifact> {
        let artifacts = self.store.load(namespace).await?;

        if artifacts.is_empty() {
            debug!("Nothing to summarize in namespace {}", namespace);
            return Ok(Artifact::info(format!(
                "Nothing to summarize in namespace \"{namespace}\""
            )));
        }

        let text = artifacts
            .iter()
            .map(|a| a.text.as_str())
            .collect::<Vec<_>>()
            .join(ARTIFACT_SEPARATOR);

        debug!(
            "Summarizing {} artifacts ({} chars) from {} with {}",
            artifacts.len(),
            text.len(),
            namespace,
            self.summarizer.name()
        );

        let summary = self.summarizer.summarize(&text).await.inspect_err(|e| {
            warn!("Summarizer {} failed: {}", self.summarizer.name(), e);
        })?;

        if summary.trim().is_empty() {
            return Err(SummarizerError::InvalidResponse(format!(
                "{} returned an empty summary",
                self.summarizer.name()
            ))
            .into());
        }

        Ok(Artifact::text(summary).with_value(json!({
            "namespace": namespace,
            "artifact_count": artifacts.len(),
        })))
    }
}
