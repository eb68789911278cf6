//! Pinecone vector search provider
//!
//! Embeds the question, queries the index data plane and maps match metadata
//! (`content`, `filename`, `source`) onto documents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::config::PineconeConfig;
use crate::error::{Error, Result};
use crate::types::Document;

use super::embedding::EmbeddingProvider;
use super::vector_search::VectorSearch;

const API_VERSION: &str = "2024-07";

/// Pinecone index search
pub struct PineconeVectorSearch {
    client: reqwest::Client,
    api_key: String,
    control_plane_url: String,
    index_name: String,
    namespace: Option<String>,
    text_key: String,
    top_k: usize,
    /// Data plane host, resolved once
    host: OnceCell<String>,
    embedder: Arc<dyn EmbeddingProvider>,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    vector: Vec<f32>,
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

impl PineconeVectorSearch {
    /// Create a new Pinecone search for `index_name`
    pub fn new(
        config: &PineconeConfig,
        index_name: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            Error::Config("PINECONE_API_KEY environment variables must be set.".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let host = OnceCell::new();
        if let Some(configured) = &config.index_host {
            // Set on a fresh cell cannot fail
            let _ = host.set(normalize_host(configured));
        }

        Ok(Self {
            client,
            api_key,
            control_plane_url: config.control_plane_url.trim_end_matches('/').to_string(),
            index_name: index_name.into(),
            namespace: config.namespace.clone(),
            text_key: config.text_key.clone(),
            top_k: config.top_k,
            host,
            embedder,
        })
    }

    /// Resolve the index data plane host through the control plane
    async fn host(&self) -> Result<&str> {
        let host = self
            .host
            .get_or_try_init(|| async {
                let url = format!("{}/indexes/{}", self.control_plane_url, self.index_name);
                tracing::debug!("Resolving Pinecone host for index {}", self.index_name);

                let response = self
                    .client
                    .get(&url)
                    .header("Api-Key", &self.api_key)
                    .header("X-Pinecone-API-Version", API_VERSION)
                    .send()
                    .await
                    .map_err(|e| Error::VectorSearch(format!("Pinecone describe failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::VectorSearch(format!(
                        "Pinecone index '{}' lookup failed ({}): {}",
                        self.index_name, status, body
                    )));
                }

                let described: DescribeIndexResponse = response.json().await.map_err(|e| {
                    Error::VectorSearch(format!("Failed to parse Pinecone index: {}", e))
                })?;

                Ok::<_, Error>(normalize_host(&described.host))
            })
            .await?;

        Ok(host.as_str())
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn metadata_str(m: &Match, key: &str) -> Result<String> {
    m.metadata
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::VectorSearch(format!(
                "Pinecone match {} has no string metadata field '{}'",
                m.id, key
            ))
        })
}

fn match_to_document(m: &Match, text_key: &str) -> Result<Document> {
    Ok(Document::new(
        metadata_str(m, text_key)?,
        metadata_str(m, "filename")?,
        metadata_str(m, "source")?,
    ))
}

#[async_trait]
impl VectorSearch for PineconeVectorSearch {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let vector = self.embedder.embed(query).await?;
        let host = self.host().await?;

        let request = QueryRequest {
            vector,
            top_k: self.top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.clone(),
        };

        let response = self
            .client
            .post(format!("{}/query", host))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::VectorSearch(format!("Pinecone query failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VectorSearch(format!(
                "Pinecone query failed ({}): {}",
                status, body
            )));
        }

        let query_response: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::VectorSearch(format!("Failed to parse Pinecone response: {}", e)))?;

        let documents = query_response
            .matches
            .iter()
            .map(|m| match_to_document(m, &self.text_key))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Pinecone returned {} documents", documents.len());
        Ok(documents)
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}
