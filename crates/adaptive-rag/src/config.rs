//! Configuration for the adaptive RAG agent
//!
//! A `RagConfig` is built once per process (TOML file plus environment
//! overrides) and handed to every component by reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "ADAPTIVE_RAG_CONFIG";

/// Main agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Per-run agent settings (user, provider, index, storage service)
    pub agent: AgentConfig,
    /// Retry budgets and reflection for the grading loop
    pub rag_loop: LoopConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Vector search backends
    pub vector_search: VectorSearchConfig,
    /// Storage services used for permission checks
    pub storage: StorageConfig,
    /// Server configuration
    pub server: ServerConfig,
}

/// Agent settings exposed to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Identity of the user asking; used for document permission checks
    pub user_email: String,
    /// Vector store provider
    pub provider: VectorProvider,
    /// Name of the vector store index
    pub index_name: String,
    /// Storage service holding the source documents
    pub storage_service_type: StorageServiceKind,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            user_email: String::new(),
            provider: VectorProvider::Pinecone,
            index_name: "rag-documents".to_string(),
            storage_service_type: StorageServiceKind::Drive,
        }
    }
}

/// Retry budgets for the retrieve/grade/generate loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Query rewrites allowed when no retrieved document is relevant
    pub retry_count_grade_documents: u32,
    /// Regenerations allowed when the answer is not grounded
    pub retry_count_hallucinations: u32,
    /// Grade the generation for groundedness and usefulness
    pub reflection: bool,
    /// Upper bound on node executions for a single run; raised per run to
    /// whatever the run's retry budgets need
    pub max_steps: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            retry_count_grade_documents: 1,
            retry_count_hallucinations: 3,
            reflection: false,
            max_steps: 64,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Model used to generate answers and rewrite questions
    pub generate_model: String,
    /// Model used for yes/no judgments
    pub reflection_model: String,
    /// Temperature for every call
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.1:8b".to_string(),
            reflection_model: "llama3.1:8b".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimensions: 768 }
    }
}

/// Vector search backends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSearchConfig {
    /// HTTP timeout for backend calls in seconds
    pub timeout_secs: u64,
    /// Pinecone settings
    pub pinecone: PineconeConfig,
    /// Azure AI Search settings
    pub azure: AzureSearchConfig,
    /// Documents returned by the in-memory store
    pub in_memory_top_k: usize,
    /// JSON array of `{content, filename, source}` loaded into the in-memory store
    pub in_memory_seed: Option<PathBuf>,
}

impl Default for VectorSearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            pinecone: PineconeConfig::default(),
            azure: AzureSearchConfig::default(),
            in_memory_top_k: 4,
            in_memory_seed: None,
        }
    }
}

/// Pinecone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeConfig {
    /// API key (env: PINECONE_API_KEY)
    pub api_key: Option<String>,
    /// Control plane used to resolve index hosts
    pub control_plane_url: String,
    /// Data plane host; looked up from the control plane when unset
    pub index_host: Option<String>,
    /// Namespace to query
    pub namespace: Option<String>,
    /// Metadata field holding the document text
    pub text_key: String,
    /// Matches per query
    pub top_k: usize,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            control_plane_url: "https://api.pinecone.io".to_string(),
            index_host: None,
            namespace: None,
            text_key: "content".to_string(),
            top_k: 4,
        }
    }
}

/// Azure AI Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureSearchConfig {
    /// Admin or query key (env: AZURE_SEARCH_API_KEY)
    pub api_key: Option<String>,
    /// Service endpoint, e.g. https://my-search.search.windows.net (env: AZURE_SEARCH_ENDPOINT)
    pub endpoint: Option<String>,
    /// REST API version
    pub api_version: String,
    /// Vector field in the index
    pub vector_field: String,
    /// Matches per query
    pub top_k: usize,
    /// Blob container URL prefixed to `sourcefile` to build document links.
    /// Required by the Azure backend (env: AZURE_STORAGE_CONTAINER_URL)
    pub container_url: String,
}

impl Default for AzureSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            api_version: "2023-11-01".to_string(),
            vector_field: "embedding".to_string(),
            top_k: 5,
            container_url: String::new(),
        }
    }
}

/// Storage service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Run retrieved documents through the storage service permission check
    pub validate_permissions: bool,
    /// Enforce per-user permissions inside the check (env: RAG_AUTH_REQUIRED)
    pub auth_required: bool,
    /// Google service account key (env: GOOGLE_APPLICATION_CREDENTIALS)
    pub credentials_path: Option<PathBuf>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Vector store provider selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VectorProvider {
    /// Pinecone serverless index
    #[default]
    Pinecone,
    /// Azure AI Search index
    AzureSearchService,
    /// Process-local store, populated at runtime
    InMemory,
}

impl VectorProvider {
    /// Configuration string for this provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pinecone => "pinecone",
            Self::AzureSearchService => "azure_search_service",
            Self::InMemory => "in_memory",
        }
    }
}

impl fmt::Display for VectorProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VectorProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "pinecone" => Ok(Self::Pinecone),
            "azure_search_service" => Ok(Self::AzureSearchService),
            "in_memory" => Ok(Self::InMemory),
            other => Err(Error::Config(format!("Unknown provider '{}'", other))),
        }
    }
}

/// Storage service selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageServiceKind {
    /// Google Drive
    #[default]
    Drive,
    /// Azure Blob Storage
    Azure,
}

impl StorageServiceKind {
    /// Configuration string for this service
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drive => "drive",
            Self::Azure => "azure",
        }
    }
}

impl fmt::Display for StorageServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageServiceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "drive" => Ok(Self::Drive),
            "azure" => Ok(Self::Azure),
            other => Err(Error::Config(format!("Unknown storage service '{}'", other))),
        }
    }
}

impl RagConfig {
    /// Load configuration: optional TOML file named by `ADAPTIVE_RAG_CONFIG`,
    /// then process environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML; missing sections and fields take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides through `lookup`; blank values are ignored
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("USER_EMAIL") {
            self.agent.user_email = v;
        }
        if let Some(v) = get("PROVIDER") {
            self.agent.provider = v.parse()?;
        }
        if let Some(v) = get("INDEX_NAME") {
            self.agent.index_name = v;
        }
        if let Some(v) = get("STORAGE_SERVICE_TYPE") {
            self.agent.storage_service_type = v.parse()?;
        }
        if let Some(v) = get("PINECONE_API_KEY") {
            self.vector_search.pinecone.api_key = Some(v);
        }
        if let Some(v) = get("AZURE_SEARCH_API_KEY") {
            self.vector_search.azure.api_key = Some(v);
        }
        if let Some(v) = get("AZURE_SEARCH_ENDPOINT") {
            self.vector_search.azure.endpoint = Some(v);
        }
        if let Some(v) = get("AZURE_STORAGE_CONTAINER_URL") {
            self.vector_search.azure.container_url = v;
        }
        if let Some(v) = get("GOOGLE_APPLICATION_CREDENTIALS") {
            self.storage.credentials_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("RAG_AUTH_REQUIRED") {
            self.storage.auth_required = v == "true";
        }

        Ok(())
    }
}
