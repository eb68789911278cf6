//! API routes for the RAG server

pub mod query;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/query", post(query::query_rag))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    Json(serde_json::json!({
        "name": "adaptive-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Adaptive RAG agent with relevance grading and self-reflection",
        "provider": config.agent.provider.as_str(),
        "index_name": config.agent.index_name,
        "storage_service_type": config.agent.storage_service_type.as_str(),
        "reflection": state.graph().loop_config().reflection,
        "endpoints": {
            "POST /api/query": "Answer a question from retrieved documents",
            "GET /api/info": "Service information",
            "GET /health": "Liveness",
            "GET /ready": "Readiness"
        }
    }))
}
