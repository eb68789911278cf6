//! RAG Server binary
//!
//! Run with: cargo run -p adaptive-rag --bin adaptive-rag-server

use adaptive_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adaptive_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RagConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Vector provider: {}", config.agent.provider);
    tracing::info!("  - Index: {}", config.agent.index_name);
    tracing::info!("  - Storage service: {}", config.agent.storage_service_type);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!("  - Reflection model: {}", config.llm.reflection_model);
    tracing::info!(
        "  - Retries: {} rewrites, {} regenerations (reflection: {})",
        config.rag_loop.retry_count_grade_documents,
        config.rag_loop.retry_count_hallucinations,
        config.rag_loop.reflection
    );

    let server = RagServer::new(config).await?;

    if !server_llm_healthy(&server).await {
        tracing::warn!("Ollama not reachable; queries will fail until it is up");
    }

    tracing::info!("API: http://{}/api/query", server.address());
    server.start().await?;

    Ok(())
}

async fn server_llm_healthy(server: &RagServer) -> bool {
    server.state().graph().health_check().await.unwrap_or(false)
}
