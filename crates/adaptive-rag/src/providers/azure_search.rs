//! Azure AI Search vector search provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AzureSearchConfig;
use crate::error::{Error, Result};
use crate::types::Document;

use super::embedding::EmbeddingProvider;
use super::vector_search::VectorSearch;

/// Azure AI Search index queried with a vector query
pub struct AzureVectorSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    index_name: String,
    api_version: String,
    vector_field: String,
    top_k: usize,
    container_url: String,
    embedder: Arc<dyn EmbeddingProvider>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    vector_queries: Vec<VectorQuery>,
    select: String,
    top: usize,
}

#[derive(Serialize)]
struct VectorQuery {
    kind: &'static str,
    vector: Vec<f32>,
    fields: String,
    k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    content: String,
    sourcefile: String,
}

impl AzureVectorSearch {
    /// Create a new Azure AI Search provider for `index_name`
    pub fn new(
        config: &AzureSearchConfig,
        index_name: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        timeout: Duration,
    ) -> Result<Self> {
        let (api_key, endpoint) = match (&config.api_key, &config.endpoint) {
            (Some(key), Some(endpoint)) => (key.clone(), endpoint.clone()),
            _ => {
                return Err(Error::Config(
                    "AZURE_SEARCH_API_KEY and AZURE_SEARCH_ENDPOINT environment variables must be set."
                        .to_string(),
                ))
            }
        };

        if config.container_url.trim().is_empty() {
            return Err(Error::Config(
                "AZURE_STORAGE_CONTAINER_URL must be set to build document links.".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            index_name: index_name.into(),
            api_version: config.api_version.clone(),
            vector_field: config.vector_field.clone(),
            top_k: config.top_k,
            container_url: config.container_url.clone(),
            embedder,
        })
    }

    fn search_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint, self.index_name, self.api_version
        )
    }

    fn build_request(&self, vector: Vec<f32>) -> SearchRequest {
        SearchRequest {
            vector_queries: vec![VectorQuery {
                kind: "vector",
                vector,
                fields: self.vector_field.clone(),
                k: self.top_k,
            }],
            select: "content,sourcefile".to_string(),
            top: self.top_k,
        }
    }

    fn hit_to_document(&self, hit: SearchHit) -> Document {
        let link = format!("{}{}", self.container_url, hit.sourcefile);
        Document::new(hit.content, hit.sourcefile, link)
    }
}

#[async_trait]
impl VectorSearch for AzureVectorSearch {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let vector = self.embedder.embed(query).await?;

        let response = self
            .client
            .post(self.search_url())
            .header("api-key", &self.api_key)
            .json(&self.build_request(vector))
            .send()
            .await
            .map_err(|e| Error::VectorSearch(format!("Azure search failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VectorSearch(format!(
                "Azure search failed ({}): {}",
                status, body
            )));
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::VectorSearch(format!("Failed to parse Azure response: {}", e)))?;

        let documents: Vec<Document> = search_response
            .value
            .into_iter()
            .map(|hit| self.hit_to_document(hit))
            .collect();

        tracing::debug!("Azure AI Search returned {} documents", documents.len());
        Ok(documents)
    }

    fn name(&self) -> &str {
        "azure_search_service"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoEmbed;

    #[async_trait]
    impl EmbeddingProvider for NoEmbed {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; 3])
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "none"
        }
    }

    fn search() -> AzureVectorSearch {
        let config = AzureSearchConfig {
            api_key: Some("key".to_string()),
            endpoint: Some("https://docs.search.windows.net/".to_string()),
            container_url: "https://blob.example/content/".to_string(),
            ..AzureSearchConfig::default()
        };
        AzureVectorSearch::new(&config, "manuals", Arc::new(NoEmbed), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_missing_credentials() {
        let result = AzureVectorSearch::new(
            &AzureSearchConfig::default(),
            "manuals",
            Arc::new(NoEmbed),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_container_url() {
        let config = AzureSearchConfig {
            api_key: Some("key".to_string()),
            endpoint: Some("https://docs.search.windows.net".to_string()),
            ..AzureSearchConfig::default()
        };
        let result = AzureVectorSearch::new(&config, "manuals", Arc::new(NoEmbed), Duration::from_secs(5));
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("AZURE_STORAGE_CONTAINER_URL")));
    }

    #[test]
    fn test_search_url() {
        assert_eq!(
            search().search_url(),
            "https://docs.search.windows.net/indexes/manuals/docs/search?api-version=2023-11-01"
        );
    }

    #[test]
    fn test_request_shape() {
        let json = serde_json::to_value(search().build_request(vec![1.0])).unwrap();
        assert_eq!(json["vectorQueries"][0]["kind"], "vector");
        assert_eq!(json["vectorQueries"][0]["fields"], "embedding");
        assert_eq!(json["vectorQueries"][0]["k"], 5);
    }

    #[test]
    fn test_hit_links_into_container() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"value": [{"@search.score": 0.8, "content": "Calibrate monthly.", "sourcefile": "sop-12.pdf"}]}"#,
        )
        .unwrap();
        let search = search();
        let docs: Vec<Document> = response
            .value
            .into_iter()
            .map(|h| search.hit_to_document(h))
            .collect();

        assert_eq!(docs[0].filename, "sop-12.pdf");
        assert_eq!(docs[0].source, "https://blob.example/content/sop-12.pdf");
    }
}
