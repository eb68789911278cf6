//! Vector search trait: question in, ranked documents out

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Document;

/// Trait for vector search backends
///
/// Implementations:
/// - `PineconeVectorSearch`: Pinecone index
/// - `AzureVectorSearch`: Azure AI Search index
/// - `InMemoryVectorSearch`: process-local cosine search
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Retrieve documents for a question, in the backend's ranking order
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
