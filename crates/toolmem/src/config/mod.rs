use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, ToolMemoryError};
use crate::storage::DistanceMetric;

/// Main configuration structure for toolmem
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Tool output memory settings
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Vector store backend configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Query engine configuration
    #[serde(default)]
    pub query: QueryConfig,
    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Summarization strategy configuration
    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

impl Config {
    /// Load configuration from `path`, or from the first default location
    /// that exists, falling back to defaults.
    ///
    /// Default locations: `~/.toolmem/config.toml`,
    /// `<config dir>/toolmem/config.toml`, `./config.toml`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let default_paths = [
            dirs::home_dir().map(|h| h.join(".toolmem").join("config.toml")),
            dirs::config_dir().map(|c| c.join("toolmem").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ];

        for candidate in default_paths.iter().flatten() {
            if candidate.exists() {
                return Self::from_file(candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            ToolMemoryError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse TOML config content
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ToolMemoryError::Config(format!("Failed to parse config: {e}")))
    }
}

/// Tool output memory configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Memory identifier shown in stored-output descriptions
    #[serde(default = "default_memory_id")]
    pub id: String,
    /// Outputs at or below this many characters are returned inline instead of stored
    #[serde(default)]
    pub inline_threshold_chars: Option<usize>,
    /// How namespaces are minted
    #[serde(default)]
    pub namespaces: NamespaceStrategy,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            id: default_memory_id(),
            inline_threshold_chars: None,
            namespaces: NamespaceStrategy::default(),
        }
    }
}

fn default_memory_id() -> String {
    "ToolMemory".to_string()
}

/// Namespace minting strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceStrategy {
    /// Per-tool monotonic counter; deterministic within one process
    Counter,
    /// Random UUID per invocation; safe across processes sharing a store
    #[default]
    Uuid,
}

/// Vector store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process store, dropped with the process
    Memory,
    /// LanceDB tables under `data_dir`
    #[default]
    Lance,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Base directory for LanceDB data
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Distance function for nearest-neighbor search
    #[serde(default)]
    pub metric: DistanceMetric,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
            metric: DistanceMetric::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".toolmem"))
        .unwrap_or_else(|| PathBuf::from(".toolmem"))
}

/// Query engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Number of nearest artifacts composed into an answer
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Separator placed between composed artifact texts
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Truncate answers to this many characters
    #[serde(default)]
    pub max_answer_chars: Option<usize>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            separator: default_separator(),
            max_answer_chars: None,
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_separator() -> String {
    "\n\n".to_string()
}

/// Embedding provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider: `fastembed` or `hash`
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// fastembed model short name
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Vector dimension for the `hash` provider
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
        }
    }
}

fn default_embedding_provider() -> String {
    "fastembed".to_string()
}

fn default_embedding_model() -> String {
    "multilingual-e5-small".to_string()
}

fn default_embedding_dimension() -> usize {
    384
}

/// Remote summarizer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    /// API endpoint URL (OpenAI-compatible, without `/chat/completions`)
    #[serde(default)]
    pub api_url: String,
    /// Environment variable name for API key
    #[serde(default = "default_summarizer_api_key_env")]
    pub api_key_env: String,
    /// Model identifier for remote API
    #[serde(default = "default_summarizer_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_summarizer_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum tokens in the generated summary
    #[serde(default = "default_summarizer_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_summarizer_temperature")]
    pub temperature: f32,
    /// Attempts per request on rate limiting or transport errors
    #[serde(default = "default_summarizer_max_retries")]
    pub max_retries: u32,
    /// First backoff delay, doubled after each attempt
    #[serde(default = "default_summarizer_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key_env: default_summarizer_api_key_env(),
            model: default_summarizer_model(),
            timeout_secs: default_summarizer_timeout_secs(),
            max_tokens: default_summarizer_max_tokens(),
            temperature: default_summarizer_temperature(),
            max_retries: default_summarizer_max_retries(),
            retry_delay_ms: default_summarizer_retry_delay_ms(),
        }
    }
}

fn default_summarizer_api_key_env() -> String {
    "TOOLMEM_API_KEY".to_string()
}

fn default_summarizer_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_summarizer_timeout_secs() -> u64 {
    60
}

fn default_summarizer_max_tokens() -> u32 {
    1024
}

fn default_summarizer_temperature() -> f32 {
    0.2
}

fn default_summarizer_max_retries() -> u32 {
    3
}

fn default_summarizer_retry_delay_ms() -> u64 {
    1000
}
