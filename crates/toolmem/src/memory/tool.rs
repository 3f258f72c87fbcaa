//! Tool output memory
//!
//! Intercepts tool outputs, stores them under a fresh namespace and hands
//! back a short description that tells the reasoning process how to get at
//! the content later through `search` and `summarize`.

use std::fmt;
use std::sync::Arc;

use dashmap::DashSet;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::artifact::Artifact;
use crate::config::{Config, NamespaceStrategy, QueryConfig};
use crate::embedding::{self, EmbeddingProvider};
use crate::engine::{QueryEngine, SummaryEngine};
use crate::error::{Result, ToolMemoryError};
use crate::memory::action::{
    ActionDescriptor, ActionRequest, MemoryAction, NAMESPACE_KEY, QUERY_KEY,
};
use crate::memory::namespace::{CounterNamespaces, NamespaceGenerator, UuidNamespaces};
use crate::storage::{self, ArtifactStore, LocalVectorStore, VectorStoreDriver};
use crate::summarizer::Summarizer;

/// Attempts at minting an unused namespace before giving up
const MAX_MINT_ATTEMPTS: usize = 16;

/// Identifies the tool method that produced an output
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolDescriptor {
    pub name: String,
    pub method: String,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.method)
    }
}

/// The unit of reasoning work that invoked the tool
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubtaskRef {
    pub id: String,
}

impl SubtaskRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Raw output of a tool: one artifact or a list of them
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Single(Artifact),
    Many(Vec<Artifact>),
}

impl ToolOutput {
    pub fn into_artifacts(self) -> Vec<Artifact> {
        match self {
            ToolOutput::Single(artifact) => vec![artifact],
            ToolOutput::Many(artifacts) => artifacts,
        }
    }
}

impl From<Artifact> for ToolOutput {
    fn from(artifact: Artifact) -> Self {
        ToolOutput::Single(artifact)
    }
}

impl From<&Artifact> for ToolOutput {
    fn from(artifact: &Artifact) -> Self {
        ToolOutput::Single(artifact.clone())
    }
}

impl From<Vec<Artifact>> for ToolOutput {
    fn from(artifacts: Vec<Artifact>) -> Self {
        ToolOutput::Many(artifacts)
    }
}

impl From<&[Artifact]> for ToolOutput {
    fn from(artifacts: &[Artifact]) -> Self {
        ToolOutput::Many(artifacts.to_vec())
    }
}

/// Decides which outputs bypass the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputPolicy {
    /// Outputs with at most this many characters are returned inline
    pub inline_threshold_chars: Option<usize>,
}

impl OutputPolicy {
    pub fn store_everything() -> Self {
        Self::default()
    }

    pub fn inline_below(threshold: usize) -> Self {
        Self {
            inline_threshold_chars: Some(threshold),
        }
    }

    /// The inline artifact for `artifacts`, if the policy keeps them out of the store
    fn inline(&self, artifacts: &[Artifact]) -> Option<Artifact> {
        let threshold = self.inline_threshold_chars?;
        let total: usize = artifacts.iter().map(Artifact::char_len).sum();
        if total > threshold {
            return None;
        }

        match artifacts {
            [single] => Some(single.clone()),
            many => Some(Artifact::text(
                many.iter()
                    .map(|a| a.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            )),
        }
    }
}

/// A tool output that went into memory
#[derive(Debug, Clone)]
pub struct StoredOutput {
    pub namespace: String,
    /// Description handed back to the reasoning process
    pub description: Artifact,
    pub actions: Vec<ActionDescriptor>,
}

/// Result of [`ToolOutputMemory::process_output`]
#[derive(Debug, Clone)]
pub enum ProcessedOutput {
    /// Small enough to pass through untouched
    Inline(Artifact),
    Stored(StoredOutput),
}

impl ProcessedOutput {
    /// The artifact that re-enters the reasoning context
    pub fn artifact(&self) -> &Artifact {
        match self {
            ProcessedOutput::Inline(artifact) => artifact,
            ProcessedOutput::Stored(stored) => &stored.description,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            ProcessedOutput::Inline(_) => None,
            ProcessedOutput::Stored(stored) => Some(&stored.namespace),
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, ProcessedOutput::Stored(_))
    }
}

/// Namespaced memory for tool outputs
pub struct ToolOutputMemory {
    id: String,
    query_engine: QueryEngine,
    summary_engine: SummaryEngine,
    namespaces: Box<dyn NamespaceGenerator>,
    minted: DashSet<String>,
    policy: OutputPolicy,
}

impl ToolOutputMemory {
    /// Create a memory from engines that share one artifact store.
    ///
    /// Namespaces come from a per-tool counter and every output is stored.
    pub fn new(
        id: impl Into<String>,
        query_engine: QueryEngine,
        summary_engine: SummaryEngine,
    ) -> Self {
        Self {
            id: id.into(),
            query_engine,
            summary_engine,
            namespaces: Box::new(CounterNamespaces::new()),
            minted: DashSet::new(),
            policy: OutputPolicy::default(),
        }
    }

    pub fn builder(id: impl Into<String>) -> ToolOutputMemoryBuilder {
        ToolOutputMemoryBuilder::new(id)
    }

    /// Assemble a memory from configuration.
    ///
    /// Namespaces already present in the store count as minted, and the
    /// generator resumes past them.
    pub async fn from_config(config: &Config, summarizer: Arc<dyn Summarizer>) -> Result<Self> {
        let embedder = embedding::from_config(&config.embedding)?;
        let driver = storage::open_driver(&config.storage, embedder.dimension()).await?;

        let builder = Self::builder(config.memory.id.clone())
            .driver(driver)
            .embedder(embedder)
            .summarizer(summarizer)
            .query_config(config.query.clone())
            .policy(OutputPolicy {
                inline_threshold_chars: config.memory.inline_threshold_chars,
            });

        let builder = match config.memory.namespaces {
            NamespaceStrategy::Counter => builder.namespaces(CounterNamespaces::new()),
            NamespaceStrategy::Uuid => builder.namespaces(UuidNamespaces),
        };

        let memory = builder.build()?;
        let existing = memory.store().namespaces().await?;
        memory.namespaces.resume(&memory.id, &existing);
        for namespace in existing {
            memory.minted.insert(namespace);
        }
        Ok(memory)
    }

    pub fn with_namespaces(mut self, generator: impl NamespaceGenerator + 'static) -> Self {
        self.namespaces = Box::new(generator);
        self
    }

    pub fn with_policy(mut self, policy: OutputPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn policy(&self) -> OutputPolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        self.query_engine.store()
    }

    /// Store a tool output and describe how to retrieve it.
    ///
    /// Outputs under the inline threshold are returned as-is. Everything else
    /// goes into a newly minted namespace; the returned description, not the
    /// raw output, is what the reasoning process should see.
    pub async fn process_output(
        &self,
        tool: &ToolDescriptor,
        subtask: &SubtaskRef,
        output: impl Into<ToolOutput>,
    ) -> Result<ProcessedOutput> {
        let artifacts = output.into().into_artifacts();

        if let Some(inline) = self.policy.inline(&artifacts) {
            debug!("Returning {} output inline ({} chars)", tool, inline.char_len());
            return Ok(ProcessedOutput::Inline(inline));
        }

        let namespace = self.mint_namespace(tool, subtask)?;
        let stored = self
            .store()
            .upsert_many([(namespace.as_str(), artifacts.as_slice())])
            .await?;

        info!(
            "Stored {} artifacts from {} in namespace {}",
            stored, tool, namespace
        );

        let actions = self.actions(&namespace);
        let description = Artifact::text(self.describe(tool, &namespace, &actions))
            .with_name(self.id.clone())
            .with_value(json!({
                "memory": self.id,
                "namespace": namespace,
                "artifact_count": stored,
            }));

        Ok(ProcessedOutput::Stored(StoredOutput {
            namespace,
            description,
            actions,
        }))
    }

    /// Answer the request's `query` from its `artifact_namespace`
    pub async fn search(&self, request: &ActionRequest) -> Result<Artifact> {
        let query = request.require(QUERY_KEY)?;
        let namespace = request.require(NAMESPACE_KEY)?;

        debug!("Searching namespace {}", namespace);
        self.query_engine.query(query, namespace).await
    }

    /// Summarize everything stored under the request's `artifact_namespace`
    pub async fn summarize(&self, request: &ActionRequest) -> Result<Artifact> {
        let namespace = request.require(NAMESPACE_KEY)?;

        debug!("Summarizing namespace {}", namespace);
        self.summary_engine.summarize(namespace).await
    }

    pub async fn execute(&self, action: MemoryAction, request: &ActionRequest) -> Result<Artifact> {
        match action {
            MemoryAction::Search => self.search(request).await,
            MemoryAction::Summarize => self.summarize(request).await,
        }
    }

    /// Route a request by action name
    pub async fn dispatch(&self, action: &str, request: &ActionRequest) -> Result<Artifact> {
        let action: MemoryAction = action.parse()?;
        self.execute(action, request).await
    }

    /// Every artifact stored under `namespace`, in insertion order
    pub async fn load_artifacts(&self, namespace: &str) -> Result<Vec<Artifact>> {
        self.store().load(namespace).await
    }

    /// Actions available for `namespace`
    pub fn actions(&self, namespace: &str) -> Vec<ActionDescriptor> {
        MemoryAction::ALL
            .iter()
            .map(|action| ActionDescriptor::new(*action, namespace))
            .collect()
    }

    fn mint_namespace(&self, tool: &ToolDescriptor, subtask: &SubtaskRef) -> Result<String> {
        for _ in 0..MAX_MINT_ATTEMPTS {
            let namespace = self.namespaces.next_namespace(&self.id, tool, subtask);
            if self.minted.insert(namespace.clone()) {
                return Ok(namespace);
            }
            warn!("Namespace {} already minted, generating another", namespace);
        }

        Err(ToolMemoryError::Config(format!(
            "Namespace generator produced {MAX_MINT_ATTEMPTS} used namespaces in a row"
        )))
    }

    fn describe(
        &self,
        tool: &ToolDescriptor,
        namespace: &str,
        actions: &[ActionDescriptor],
    ) -> String {
        let mut description = format!(
            "Output of \"{tool}\" was stored in memory \"{}\" with the following artifact namespace: {namespace}\n\nAvailable actions:",
            self.id
        );
        for action in actions {
            description.push_str("\n- ");
            description.push_str(&action.usage());
        }
        description
    }
}

/// Builder for [`ToolOutputMemory`] with injected capabilities
pub struct ToolOutputMemoryBuilder {
    id: String,
    driver: Option<Arc<dyn VectorStoreDriver>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    query_config: QueryConfig,
    namespaces: Option<Box<dyn NamespaceGenerator>>,
    policy: OutputPolicy,
}

impl ToolOutputMemoryBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            driver: None,
            embedder: None,
            summarizer: None,
            query_config: QueryConfig::default(),
            namespaces: None,
            policy: OutputPolicy::default(),
        }
    }

    /// Vector store driver; defaults to an in-memory store
    pub fn driver(mut self, driver: Arc<dyn VectorStoreDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn query_config(mut self, config: QueryConfig) -> Self {
        self.query_config = config;
        self
    }

    /// Namespace generator; defaults to a per-tool counter
    pub fn namespaces(mut self, generator: impl NamespaceGenerator + 'static) -> Self {
        self.namespaces = Some(Box::new(generator));
        self
    }

    pub fn policy(mut self, policy: OutputPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<ToolOutputMemory> {
        let embedder = self.embedder.ok_or_else(|| {
            ToolMemoryError::Config("no embedding provider configured".to_string())
        })?;
        let summarizer = self
            .summarizer
            .ok_or_else(|| ToolMemoryError::Config("no summarizer configured".to_string()))?;
        let driver = self
            .driver
            .unwrap_or_else(|| Arc::new(LocalVectorStore::default()));

        debug!(
            "Building memory {} with driver {} and embedder {}",
            self.id,
            driver.name(),
            embedder.name()
        );

        let store = Arc::new(ArtifactStore::new(driver, embedder));
        let mut memory = ToolOutputMemory::new(
            self.id,
            QueryEngine::new(store.clone(), self.query_config),
            SummaryEngine::new(store, summarizer),
        )
        .with_policy(self.policy);

        if let Some(namespaces) = self.namespaces {
            memory.namespaces = namespaces;
        }
        Ok(memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarizer::SummarizerError;
    use crate::testing::{
        FailingDriver, FailingSummarizer, FixedEmbedding, MockEmbedding, RecordingDriver,
        StaticSummarizer,
    };

    const PREFIX: &str = "Output of \"MockTool.test\" was stored in memory \"MyMemory\" with the following artifact namespace:";

    fn tool() -> ToolDescriptor {
        ToolDescriptor::new("MockTool", "test")
    }

    fn subtask() -> SubtaskRef {
        SubtaskRef::new("subtask-1")
    }

    fn memory() -> ToolOutputMemory {
        ToolOutputMemory::builder("MyMemory")
            .embedder(Arc::new(MockEmbedding::new()))
            .summarizer(Arc::new(StaticSummarizer::new("foobar summary")))
            .build()
            .unwrap()
    }

    fn recording_memory(driver: Arc<RecordingDriver>) -> ToolOutputMemory {
        ToolOutputMemory::builder("MyMemory")
            .driver(driver)
            .embedder(Arc::new(FixedEmbedding::new(vec![1.0, 0.0, 0.0])))
            .summarizer(Arc::new(StaticSummarizer::new("foobar summary")))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_embedder_and_summarizer() {
        let missing_embedder = ToolOutputMemory::builder("M")
            .summarizer(Arc::new(FailingSummarizer))
            .build();
        assert!(matches!(missing_embedder, Err(ToolMemoryError::Config(_))));

        let missing_summarizer = ToolOutputMemory::builder("M")
            .embedder(Arc::new(MockEmbedding::new()))
            .build();
        assert!(matches!(missing_summarizer, Err(ToolMemoryError::Config(_))));
    }

    #[test]
    fn test_inline_policy() {
        let policy = OutputPolicy::inline_below(5);

        assert_eq!(
            policy.inline(&[Artifact::text("abc")]).unwrap().text,
            "abc"
        );
        assert_eq!(
            policy
                .inline(&[Artifact::text("ab"), Artifact::text("c")])
                .unwrap()
                .text,
            "ab\nc"
        );
        assert!(policy.inline(&[Artifact::text("abcdef")]).is_none());
        assert_eq!(policy.inline(&[]).unwrap().text, "");
        assert!(OutputPolicy::store_everything().inline(&[]).is_none());
    }

    #[tokio::test]
    async fn test_process_single_output() {
        let memory = memory();

        let processed = memory
            .process_output(&tool(), &subtask(), Artifact::text("foo"))
            .await
            .unwrap();

        assert!(processed.is_stored());
        assert!(processed.artifact().text.starts_with(PREFIX));
        let namespace = processed.namespace().unwrap();
        assert_eq!(namespace, "MyMemory.MockTool.subtask-1.1");
        assert!(processed.artifact().text.contains(namespace));
    }

    #[tokio::test]
    async fn test_process_list_output_loads_both() {
        let memory = memory();
        let output = vec![Artifact::text("foo"), Artifact::text("bar")];

        let processed = memory
            .process_output(&tool(), &subtask(), &output[..])
            .await
            .unwrap();

        assert!(processed.artifact().text.starts_with(PREFIX));
        let loaded = memory
            .load_artifacts(processed.namespace().unwrap())
            .await
            .unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].same_content(&output[0]));
        assert!(loaded[1].same_content(&output[1]));
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].text, "foo");
    }

    #[tokio::test]
    async fn test_description_lists_prebound_actions() {
        let memory = memory();

        let processed = memory
            .process_output(&tool(), &subtask(), Artifact::text("foo"))
            .await
            .unwrap();

        let ProcessedOutput::Stored(stored) = processed else {
            panic!("expected stored output");
        };
        let text = &stored.description.text;
        assert!(text.contains(&format!(
            "namespace: {}\n\nAvailable actions:",
            stored.namespace
        )));
        assert!(text.contains("\n- search "));
        assert!(text.contains("\n- summarize "));
        assert_eq!(stored.actions.len(), 2);
        assert!(stored.actions.iter().all(|a| a.namespace == stored.namespace));
    }

    #[tokio::test]
    async fn test_successive_outputs_get_distinct_namespaces() {
        let memory = memory();
        let mut seen = std::collections::HashSet::new();

        for i in 0..5 {
            let processed = memory
                .process_output(&tool(), &subtask(), Artifact::text(format!("out {i}")))
                .await
                .unwrap();
            assert!(seen.insert(processed.namespace().unwrap().to_string()));
        }
    }

    #[tokio::test]
    async fn test_colliding_generator_is_rejected() {
        struct Constant;
        impl NamespaceGenerator for Constant {
            fn next_namespace(&self, _: &str, _: &ToolDescriptor, _: &SubtaskRef) -> String {
                "same".to_string()
            }
        }

        let memory = memory().with_namespaces(Constant);
        memory
            .process_output(&tool(), &subtask(), Artifact::text("a"))
            .await
            .unwrap();

        let result = memory
            .process_output(&tool(), &subtask(), Artifact::text("b"))
            .await;
        assert!(matches!(result, Err(ToolMemoryError::Config(_))));
        assert_eq!(memory.load_artifacts("same").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_returns_stored_content() {
        let driver = Arc::new(RecordingDriver::default());
        let memory = recording_memory(driver.clone());
        let processed = memory
            .process_output(&tool(), &subtask(), Artifact::text("foobar"))
            .await
            .unwrap();

        let answer = memory
            .search(&ActionRequest::search("foo", processed.namespace().unwrap()))
            .await
            .unwrap();

        assert!(answer.text.contains("foobar"));
        assert_eq!(driver.queries(), 1);
    }

    #[tokio::test]
    async fn test_summarize_empty_namespace_skips_strategy() {
        let summarizer = Arc::new(StaticSummarizer::new("foobar summary"));
        let memory = ToolOutputMemory::builder("MyMemory")
            .embedder(Arc::new(MockEmbedding::new()))
            .summarizer(summarizer.clone())
            .build()
            .unwrap();

        let result = memory
            .summarize(&ActionRequest::summarize("foobar"))
            .await
            .unwrap();

        assert!(result.is_info());
        assert_eq!(summarizer.calls(), 0);
    }

    #[tokio::test]
    async fn test_summarize_returns_strategy_output() {
        let memory = memory();
        let processed = memory
            .process_output(&tool(), &subtask(), Artifact::text("foobar"))
            .await
            .unwrap();

        let request = ActionRequest::new(json!({
            "values": { "artifact_namespace": processed.namespace().unwrap() }
        }));
        let summary = memory.summarize(&request).await.unwrap();

        assert_eq!(summary.text, "foobar summary");
    }

    #[tokio::test]
    async fn test_summarizer_failure_surfaces() {
        let memory = ToolOutputMemory::builder("MyMemory")
            .embedder(Arc::new(MockEmbedding::new()))
            .summarizer(Arc::new(FailingSummarizer))
            .build()
            .unwrap();
        let processed = memory
            .process_output(&tool(), &subtask(), Artifact::text("foo"))
            .await
            .unwrap();

        let result = memory
            .summarize(&ActionRequest::summarize(processed.namespace().unwrap()))
            .await;

        assert!(matches!(
            result,
            Err(ToolMemoryError::Summarization(
                SummarizerError::UpstreamUnavailable(_)
            ))
        ));
    }

    #[tokio::test]
    async fn test_malformed_requests_fail_before_store_access() {
        let driver = Arc::new(RecordingDriver::default());
        let memory = recording_memory(driver.clone());

        let no_query = memory.search(&ActionRequest::summarize("ns")).await;
        let no_namespace = memory
            .search(&ActionRequest::new(json!({"query": "foo"})))
            .await;
        let empty = memory.summarize(&ActionRequest::new(json!({}))).await;

        for result in [no_query, no_namespace, empty] {
            assert!(matches!(result, Err(ToolMemoryError::MalformedRequest(_))));
        }
        assert_eq!(driver.calls(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_name() {
        let memory = memory();
        let processed = memory
            .process_output(&tool(), &subtask(), Artifact::text("foo"))
            .await
            .unwrap();
        let namespace = processed.namespace().unwrap();

        let summary = memory
            .dispatch("summarize", &ActionRequest::summarize(namespace))
            .await
            .unwrap();
        assert_eq!(summary.text, "foobar summary");

        let unknown = memory
            .dispatch("forget", &ActionRequest::summarize(namespace))
            .await;
        assert!(matches!(unknown, Err(ToolMemoryError::MalformedRequest(_))));
    }

    #[tokio::test]
    async fn test_action_descriptors_drive_requests() {
        let memory = memory();
        let processed = memory
            .process_output(&tool(), &subtask(), Artifact::text("foo"))
            .await
            .unwrap();

        for descriptor in memory.actions(processed.namespace().unwrap()) {
            let result = memory
                .execute(descriptor.action, &descriptor.request(Some("foo")))
                .await
                .unwrap();
            assert!(!result.is_info());
        }
    }

    #[tokio::test]
    async fn test_load_artifacts_is_idempotent() {
        let memory = memory();
        let processed = memory
            .process_output(
                &tool(),
                &subtask(),
                vec![Artifact::text("a"), Artifact::text("b")],
            )
            .await
            .unwrap();
        let namespace = processed.namespace().unwrap();

        let first = memory.load_artifacts(namespace).await.unwrap();
        let second = memory.load_artifacts(namespace).await.unwrap();

        assert_eq!(first, second);
        assert!(memory.load_artifacts("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inline_output_leaves_store_untouched() {
        let driver = Arc::new(RecordingDriver::default());
        let memory = recording_memory(driver.clone()).with_policy(OutputPolicy::inline_below(10));

        let processed = memory
            .process_output(&tool(), &subtask(), Artifact::text("short"))
            .await
            .unwrap();

        assert!(!processed.is_stored());
        assert_eq!(processed.artifact().text, "short");
        assert_eq!(driver.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_output_without_threshold_is_stored() {
        let memory = memory();

        let processed = memory
            .process_output(&tool(), &subtask(), Vec::<Artifact>::new())
            .await
            .unwrap();

        assert!(processed.artifact().text.starts_with(PREFIX));
        let namespace = processed.namespace().unwrap();
        assert!(memory.load_artifacts(namespace).await.unwrap().is_empty());
    }

    fn unavailable_store_memory(summarizer: Arc<StaticSummarizer>) -> ToolOutputMemory {
        ToolOutputMemory::builder("MyMemory")
            .driver(Arc::new(FailingDriver))
            .embedder(Arc::new(MockEmbedding::new()))
            .summarizer(summarizer)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let memory = unavailable_store_memory(Arc::new(StaticSummarizer::new("x")));

        let result = memory
            .process_output(&tool(), &subtask(), Artifact::text("foo"))
            .await;

        assert!(matches!(result, Err(ToolMemoryError::Storage(_))));
    }

    #[tokio::test]
    async fn test_search_surfaces_storage_failure() {
        let memory = unavailable_store_memory(Arc::new(StaticSummarizer::new("x")));

        let result = memory
            .search(&ActionRequest::search("foo", "MyMemory.MockTool.subtask-1.1"))
            .await;

        assert!(matches!(result, Err(ToolMemoryError::Storage(_))));
    }

    #[tokio::test]
    async fn test_summarize_storage_failure_is_not_empty_namespace() {
        let summarizer = Arc::new(StaticSummarizer::new("x"));
        let memory = unavailable_store_memory(summarizer.clone());

        let result = memory
            .summarize(&ActionRequest::summarize("MyMemory.MockTool.subtask-1.1"))
            .await;

        assert!(matches!(result, Err(ToolMemoryError::Storage(_))));
        assert_eq!(summarizer.calls(), 0);
    }

    #[tokio::test]
    async fn test_load_artifacts_surfaces_storage_failure() {
        let memory = unavailable_store_memory(Arc::new(StaticSummarizer::new("x")));

        let result = memory.load_artifacts("MyMemory.MockTool.subtask-1.1").await;

        assert!(matches!(result, Err(ToolMemoryError::Storage(_))));
    }

    #[tokio::test]
    async fn test_from_config_memory_backend() {
        let config = Config::parse(
            r#"
            [memory]
            id = "ConfiguredMemory"
            namespaces = "counter"

            [storage]
            backend = "memory"

            [embedding]
            provider = "hash"
            dimension = 32
            "#,
        )
        .unwrap();

        let memory = ToolOutputMemory::from_config(&config, Arc::new(StaticSummarizer::new("s")))
            .await
            .unwrap();
        let processed = memory
            .process_output(&tool(), &subtask(), Artifact::text("foo"))
            .await
            .unwrap();

        assert_eq!(memory.id(), "ConfiguredMemory");
        assert_eq!(
            processed.namespace(),
            Some("ConfiguredMemory.MockTool.subtask-1.1")
        );
    }
}
