//! Provider abstractions for LLMs, embeddings and vector search
//!
//! Backends are trait objects picked once at construction time from
//! configuration.

pub mod azure_search;
pub mod embedding;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod pinecone;
pub mod vector_search;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{RagConfig, VectorProvider};
use crate::error::{Error, Result};
use crate::types::Document;

pub use azure_search::AzureVectorSearch;
pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use memory::InMemoryVectorSearch;
pub use pinecone::PineconeVectorSearch;
pub use vector_search::VectorSearch;

/// Build the vector search backend selected by `provider`
pub async fn create_vector_search(
    provider: VectorProvider,
    config: &RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<Arc<dyn VectorSearch>> {
    let index_name = config.agent.index_name.clone();
    let timeout = Duration::from_secs(config.vector_search.timeout_secs);

    let search: Arc<dyn VectorSearch> = match provider {
        VectorProvider::Pinecone => Arc::new(PineconeVectorSearch::new(
            &config.vector_search.pinecone,
            index_name,
            embedder,
            timeout,
        )?),
        VectorProvider::AzureSearchService => Arc::new(AzureVectorSearch::new(
            &config.vector_search.azure,
            index_name,
            embedder,
            timeout,
        )?),
        VectorProvider::InMemory => {
            let store = InMemoryVectorSearch::new(embedder, config.vector_search.in_memory_top_k);
            if let Some(seed) = &config.vector_search.in_memory_seed {
                let content = tokio::fs::read_to_string(seed).await.map_err(|e| {
                    Error::Config(format!("Failed to read seed {}: {}", seed.display(), e))
                })?;
                let documents: Vec<Document> = serde_json::from_str(&content)?;
                let count = store.add_documents(documents).await?;
                tracing::info!("Seeded in-memory store with {} documents", count);
            }
            Arc::new(store)
        }
    };

    tracing::info!(
        "Vector search backend: {} (index: {})",
        search.name(),
        config.agent.index_name
    );
    Ok(search)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ZeroEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ZeroEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; 4])
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "zero"
        }
    }

    #[tokio::test]
    async fn test_factory_selects_backend() {
        let mut config = RagConfig::default();
        config.vector_search.pinecone.api_key = Some("pk".to_string());
        config.vector_search.azure.api_key = Some("ak".to_string());
        config.vector_search.azure.endpoint = Some("https://s.search.windows.net".to_string());
        config.vector_search.azure.container_url = "https://blob.example/content/".to_string();

        let cases = [
            (VectorProvider::Pinecone, "pinecone"),
            (VectorProvider::AzureSearchService, "azure_search_service"),
            (VectorProvider::InMemory, "in_memory"),
        ];
        for (provider, name) in cases {
            let search = create_vector_search(provider, &config, Arc::new(ZeroEmbedder))
                .await
                .unwrap();
            assert_eq!(search.name(), name);
        }
    }

    #[tokio::test]
    async fn test_factory_requires_credentials() {
        let config = RagConfig::default();
        let pinecone =
            create_vector_search(VectorProvider::Pinecone, &config, Arc::new(ZeroEmbedder)).await;
        assert!(matches!(pinecone, Err(Error::Config(_))));

        let azure = create_vector_search(
            VectorProvider::AzureSearchService,
            &config,
            Arc::new(ZeroEmbedder),
        )
        .await;
        assert!(matches!(azure, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_in_memory_seed_file() {
        let path = std::env::temp_dir().join(format!("adaptive-rag-seed-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"[{"content": "Badge access is reviewed quarterly.", "filename": "sec.pdf", "source": "https://d/sec"}]"#,
        )
        .unwrap();

        let mut config = RagConfig::default();
        config.vector_search.in_memory_seed = Some(path.clone());
        let search = create_vector_search(VectorProvider::InMemory, &config, Arc::new(ZeroEmbedder))
            .await
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        let docs = search.retrieve("badge access").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].filename, "sec.pdf");
    }
}
