//! In-memory vector search using cosine similarity
//!
//! Documents are embedded on insert and held for the life of the process.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::Document;

use super::embedding::EmbeddingProvider;
use super::vector_search::VectorSearch;

struct Entry {
    document: Document,
    embedding: Vec<f32>,
}

/// Process-local vector search
pub struct InMemoryVectorSearch {
    entries: RwLock<Vec<Entry>>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl InMemoryVectorSearch {
    /// Create an empty store
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            embedder,
            top_k,
        }
    }

    /// Embed and add documents
    pub async fn add_documents(&self, documents: Vec<Document>) -> Result<usize> {
        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != documents.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                embeddings.len()
            )));
        }

        let mut entries = self.entries.write();
        for (document, embedding) in documents.into_iter().zip(embeddings) {
            entries.push(Entry {
                document,
                embedding,
            });
        }

        Ok(entries.len())
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cosine similarity; 0.0 when either vector has no magnitude or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorSearch for InMemoryVectorSearch {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let query_embedding = self.embedder.embed(query).await?;

        let entries = self.entries.read();
        let mut scored: Vec<(f32, &Document)> = entries
            .iter()
            .map(|e| (cosine_similarity(&query_embedding, &e.embedding), &e.document))
            .collect();

        // Stable sort keeps insertion order among ties
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds text as counts of a few keywords
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(["calibration", "vacation", "audit"]
                .iter()
                .map(|k| lower.matches(k).count() as f32)
                .collect())
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_similarity() {
        let store = InMemoryVectorSearch::new(Arc::new(KeywordEmbedder), 2);
        store
            .add_documents(vec![
                Document::new("Vacation requests go to HR.", "hr.pdf", "https://d/hr"),
                Document::new("Calibration is due every month. Calibration logs.", "cal.pdf", "https://d/cal"),
                Document::new("Audit calibration records yearly.", "audit.pdf", "https://d/audit"),
            ])
            .await
            .unwrap();

        assert_eq!(store.len(), 3);

        let docs = store.retrieve("When is calibration due?").await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].filename, "cal.pdf");
        assert_eq!(docs[1].filename, "audit.pdf");
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let store = InMemoryVectorSearch::new(Arc::new(KeywordEmbedder), 4);
        assert!(store.is_empty());
        assert!(store.retrieve("anything").await.unwrap().is_empty());
    }
}
