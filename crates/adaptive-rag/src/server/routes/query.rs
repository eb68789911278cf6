//! Query endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /api/query - Run the RAG loop for one question.
///
/// A run that ends in a loop error is still a 200; the body carries
/// `error: true` and the message.
pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    tracing::info!("Query: \"{}\"", request.question);
    let response = state.graph().answer(request).await?;
    Ok(Json(response))
}
