//! LLM provider trait for generation and yes/no judgments

use async_trait::async_trait;

use crate::error::Result;
use crate::generation::ChatPrompt;
use crate::types::BinaryScore;

/// Trait for chat models used by the RAG loop
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Free-text completion (answers, query rewrites)
    async fn generate(&self, prompt: &ChatPrompt) -> Result<String>;

    /// Structured yes/no judgment
    async fn grade(&self, prompt: &ChatPrompt) -> Result<BinaryScore>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
