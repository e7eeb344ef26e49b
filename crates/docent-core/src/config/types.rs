use docent_memory::document::{DEFAULT_MAX_FILE_SIZE, SplitterConfig, WebLoaderConfig};
use docent_memory::{DistanceMetric, IndexConfig, IndexKind};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions using research papers and trusted sources.";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub splitter: SplitterSettings,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

/// LLM provider backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    OpenAi,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_model() -> String {
    "llama3.2".into()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}

fn default_max_tokens() -> u32 {
    4096
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Completion limit for the OpenAI-compatible backend.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Only ever read from `DOCENT_LLM_API_KEY`.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            max_tokens: default_max_tokens(),
            api_key: None,
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:6334".into()
}

fn default_database() -> String {
    "default".into()
}

fn default_collection() -> String {
    "research_papers".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub index_type: IndexKind,
    #[serde(default)]
    pub metric_type: DistanceMetric,
    /// Keep vectors in process memory instead of connecting to Qdrant.
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            database: default_database(),
            collection: default_collection(),
            index_type: IndexKind::default(),
            metric_type: DistanceMetric::default(),
            in_memory: false,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            database: self.database.clone(),
            collection: self.collection.clone(),
            index_type: self.index_type,
            metric: self.metric_type,
        }
    }
}

fn default_pdf_glob() -> String {
    "data/*.pdf".into()
}

fn default_url_manifest() -> String {
    "data/web_urls.txt".into()
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_fetch_concurrency() -> usize {
    4
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default = "default_pdf_glob")]
    pub pdf_glob: String,
    /// Empty disables web sources.
    #[serde(default = "default_url_manifest")]
    pub url_manifest: String,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Per-URL timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            pdf_glob: default_pdf_glob(),
            url_manifest: default_url_manifest(),
            max_file_size: default_max_file_size(),
            fetch_timeout: default_fetch_timeout(),
            max_body_bytes: default_max_body_bytes(),
            fetch_concurrency: default_fetch_concurrency(),
        }
    }
}

impl SourcesConfig {
    #[must_use]
    pub fn web_loader_config(&self) -> WebLoaderConfig {
        WebLoaderConfig {
            timeout: self.fetch_timeout,
            max_body_bytes: self.max_body_bytes,
            concurrency: self.fetch_concurrency.max(1),
        }
    }

    #[must_use]
    pub fn manifest_path(&self) -> Option<&std::path::Path> {
        if self.url_manifest.trim().is_empty() {
            None
        } else {
            Some(std::path::Path::new(&self.url_manifest))
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SplitterSettings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for SplitterSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl SplitterSettings {
    #[must_use]
    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            ..SplitterConfig::default()
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

fn default_max_tool_iterations() -> usize {
    3
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AgentConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}
