//! Runs the retrieve/grade/generate loop to its terminal node

use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{LoopConfig, RagConfig};
use crate::error::Result;
use crate::providers::{
    self, ollama::OllamaProvider, EmbeddingProvider, LlmProvider, VectorSearch,
};
use crate::storage::{self, StorageService};
use crate::types::{QueryRequest, QueryResponse, RagOutcome, RunState};

use super::node::{self, Node};
use super::STEP_LIMIT_ERROR;

/// Result of one run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run identifier
    pub run_id: Uuid,
    /// What the terminal sink emitted
    pub outcome: RagOutcome,
    /// Nodes visited, in order, ending with `Printer`
    pub path: Vec<Node>,
    /// State at termination
    pub state: RunState,
}

impl RunReport {
    /// Number of times `node` ran
    pub fn visits(&self, node: Node) -> usize {
        self.path.iter().filter(|n| **n == node).count()
    }

    /// Convert into the API response
    pub fn into_response(self, processing_time_ms: u64) -> QueryResponse {
        let path = self.path.iter().map(|n| n.as_str().to_string()).collect();
        QueryResponse::from_outcome(self.run_id, self.outcome, path, processing_time_ms)
    }
}

/// Steps a run may take: `max_steps`, raised to the longest path the run's
/// budgets allow (four nodes per rewrite, two per regeneration)
pub fn step_limit(max_steps: usize, state: &RunState) -> usize {
    let rewrites = state.retry_count_grade_documents as usize;
    let regenerations = state.retry_count_hallucinations as usize;

    let needed = rewrites
        .saturating_add(1)
        .saturating_mul(4)
        .saturating_add(regenerations.saturating_add(1).saturating_mul(2))
        .saturating_add(2);
    max_steps.max(needed)
}

/// The adaptive RAG graph.
///
/// Holds shared providers only; each run's state is owned by that run, so a
/// single graph can serve concurrent queries.
pub struct RagGraph {
    retriever: Arc<dyn VectorSearch>,
    generation_llm: Arc<dyn LlmProvider>,
    reflection_llm: Arc<dyn LlmProvider>,
    storage: Option<Arc<dyn StorageService>>,
    loop_config: LoopConfig,
    default_user_email: String,
}

impl RagGraph {
    /// Create a graph from its collaborators
    pub fn new(
        retriever: Arc<dyn VectorSearch>,
        generation_llm: Arc<dyn LlmProvider>,
        reflection_llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            retriever,
            generation_llm,
            reflection_llm,
            storage: None,
            loop_config: LoopConfig::default(),
            default_user_email: String::new(),
        }
    }

    /// Filter retrieved documents through a storage service
    pub fn with_storage(mut self, storage: Arc<dyn StorageService>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Default budgets, reflection and step limit for new runs
    pub fn with_loop_config(mut self, loop_config: LoopConfig) -> Self {
        self.loop_config = loop_config;
        self
    }

    /// User identity for runs that don't name one
    pub fn with_default_user_email(mut self, user_email: impl Into<String>) -> Self {
        self.default_user_email = user_email.into();
        self
    }

    /// Build Ollama providers, the configured vector backend and (when
    /// enabled) the storage service
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        let (embedder, generation, reflection) =
            OllamaProvider::new(&config.llm, config.embeddings.dimensions)?.split();
        tracing::info!(
            "LLM provider: {} (generation: {}, reflection: {})",
            generation.name(),
            generation.model(),
            reflection.model()
        );

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embedder);
        let retriever =
            providers::create_vector_search(config.agent.provider, config, embedder).await?;

        let mut graph = Self::new(retriever, Arc::new(generation), Arc::new(reflection))
            .with_loop_config(config.rag_loop.clone())
            .with_default_user_email(config.agent.user_email.clone());

        if config.storage.validate_permissions {
            let service =
                storage::create_storage_service(config.agent.storage_service_type, &config.storage)?;
            tracing::info!("Permission checks via {} storage service", service.name());
            graph = graph.with_storage(service);
        }

        Ok(graph)
    }

    /// Vector backend name
    pub fn retriever_name(&self) -> &str {
        self.retriever.name()
    }

    /// Default loop settings
    pub fn loop_config(&self) -> &LoopConfig {
        &self.loop_config
    }

    /// Health of both LLM providers
    pub async fn health_check(&self) -> Result<bool> {
        Ok(self.generation_llm.health_check().await? && self.reflection_llm.health_check().await?)
    }

    /// Validate a request and run it
    pub async fn answer(&self, request: QueryRequest) -> Result<QueryResponse> {
        request.validate()?;
        let start = Instant::now();

        let state = request.into_run_state(&self.loop_config, &self.default_user_email);
        let report = self.run(state).await;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Run {} finished in {}ms ({} steps, error: {})",
            report.run_id,
            processing_time_ms,
            report.path.len(),
            report.outcome.is_error()
        );
        Ok(report.into_response(processing_time_ms))
    }

    /// Drive `state` from `Retrieve` to `Printer`.
    ///
    /// Node failures do not escape: they become the run's terminal error
    /// message, so every run ends at the printer.
    pub async fn run(&self, state: RunState) -> RunReport {
        let span = tracing::info_span!("rag_run", run_id = %state.run_id);
        self.run_inner(state).instrument(span).await
    }

    async fn run_inner(&self, mut state: RunState) -> RunReport {
        tracing::info!("Question: \"{}\"", state.question);

        let limit = step_limit(self.loop_config.max_steps, &state);
        let mut path = Vec::new();
        let mut current = Node::Retrieve;

        loop {
            path.push(current);
            if current.is_terminal() {
                break;
            }

            if path.len() > limit {
                tracing::error!("Step limit {} reached at {}", limit, current);
                state.fail(STEP_LIMIT_ERROR);
                current = Node::Printer;
                continue;
            }

            current = match self.step(current, &mut state).await {
                Ok(next) => {
                    tracing::debug!("{} -> {}", current, next);
                    next
                }
                Err(e) => {
                    tracing::warn!("Node {} failed: {}", current, e);
                    state.fail(e.to_string());
                    Node::Printer
                }
            };
        }

        let outcome = node::printer(&state);
        RunReport {
            run_id: state.run_id,
            outcome,
            path,
            state,
        }
    }

    /// Execute one node and return the next
    async fn step(&self, current: Node, state: &mut RunState) -> Result<Node> {
        match current {
            Node::Retrieve => {
                node::retrieve(self.retriever.as_ref(), self.storage.as_deref(), state).await?;
                Ok(Node::GradeDocuments)
            }
            Node::GradeDocuments => {
                let documents = std::mem::take(&mut state.documents);
                state.documents =
                    node::grade_documents(self.reflection_llm.as_ref(), &state.question, documents)
                        .await?;
                Ok(Node::DecideToGenerate)
            }
            Node::DecideToGenerate => Ok(node::decide_to_generate(state)),
            Node::TransformQuery => {
                node::transform_query(self.generation_llm.as_ref(), state).await?;
                Ok(Node::Retrieve)
            }
            Node::Generate => {
                node::generate(self.generation_llm.as_ref(), state).await?;
                Ok(node::reflection_validator(state))
            }
            Node::GradeGeneration => {
                node::grade_generation_v_documents_and_question(self.reflection_llm.as_ref(), state)
                    .await
            }
            Node::Printer => Ok(Node::Printer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(rewrites: u32, regenerations: u32) -> RunState {
        RunState::new("q", &LoopConfig::default())
            .with_grade_documents_retries(rewrites)
            .with_hallucination_retries(regenerations)
    }

    #[test]
    fn test_step_limit_keeps_configured_floor() {
        assert_eq!(step_limit(64, &state(1, 3)), 64);
    }

    #[test]
    fn test_step_limit_covers_budgets() {
        assert_eq!(step_limit(64, &state(20, 0)), 88);
        assert_eq!(step_limit(0, &state(0, 0)), 8);
    }

    #[test]
    fn test_step_limit_saturates() {
        assert!(step_limit(64, &state(u32::MAX, u32::MAX)) >= u32::MAX as usize);
    }
}
