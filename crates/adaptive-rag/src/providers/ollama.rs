//! Ollama-based providers for embeddings and LLM
//!
//! Both wrap a shared `OllamaClient`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::generation::{ChatPrompt, OllamaClient};
use crate::types::BinaryScore;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: &LlmConfig, dimensions: usize) -> Result<Self> {
        Ok(Self::from_client(Arc::new(OllamaClient::new(config)?), dimensions))
    }

    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, dimensions: usize) -> Self {
        Self { client, dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama chat provider
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    /// Create a provider bound to `model`
    pub fn from_client(client: Arc<OllamaClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, prompt: &ChatPrompt) -> Result<String> {
        let text = self.client.chat(&self.model, prompt, None).await?;
        Ok(text.trim().to_string())
    }

    async fn grade(&self, prompt: &ChatPrompt) -> Result<BinaryScore> {
        let kind = prompt
            .judgment
            .ok_or_else(|| Error::llm("grading prompt has no judgment kind"))?;
        let reply = self.client.chat(&self.model, prompt, Some(kind.schema())).await?;
        kind.parse_reply(&reply)
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Ollama providers sharing one client: embeddings, a generation model and a
/// reflection (judgment) model
pub struct OllamaProvider {
    embedder: OllamaEmbedder,
    generation: OllamaLlm,
    reflection: OllamaLlm,
}

impl OllamaProvider {
    /// Create the combined provider
    pub fn new(config: &LlmConfig, dimensions: usize) -> Result<Self> {
        let client = Arc::new(OllamaClient::new(config)?);
        Ok(Self {
            embedder: OllamaEmbedder::from_client(Arc::clone(&client), dimensions),
            generation: OllamaLlm::from_client(Arc::clone(&client), config.generate_model.clone()),
            reflection: OllamaLlm::from_client(client, config.reflection_model.clone()),
        })
    }

    /// Split into embedder, generation LLM and reflection LLM
    pub fn split(self) -> (OllamaEmbedder, OllamaLlm, OllamaLlm) {
        (self.embedder, self.generation, self.reflection)
    }
}
