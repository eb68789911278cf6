//! Application state for the HTTP server

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::graph::RagGraph;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// The RAG graph; runs share providers, never state
    graph: RagGraph,
    /// Ready state
    ready: AtomicBool,
}

impl AppState {
    /// Build providers from `config`
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing RAG state (provider: {}, index: {})...",
            config.agent.provider,
            config.agent.index_name
        );
        let graph = RagGraph::from_config(&config).await?;
        Ok(Self::from_graph(config, graph))
    }

    /// Wrap an existing graph
    pub fn from_graph(config: RagConfig, graph: RagGraph) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                graph,
                ready: AtomicBool::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the graph
    pub fn graph(&self) -> &RagGraph {
        &self.inner.graph
    }

    /// Check if ready
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        self.inner.ready.store(ready, Ordering::Release);
    }
}
