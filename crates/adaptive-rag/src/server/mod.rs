//! HTTP server for the RAG agent

pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use state::AppState;

/// RAG HTTP Server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a new RAG server
    pub async fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Create from prepared state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .nest("/api", routes::api_routes())
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if self.config.server.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router.layer(cors)
        } else {
            router
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting RAG server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Shared state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(state: axum::extract::State<AppState>) -> axum::http::StatusCode {
    if state.is_ready() {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::generation::ChatPrompt;
    use crate::graph::RagGraph;
    use crate::providers::{LlmProvider, VectorSearch};
    use crate::types::{BinaryScore, Document};

    struct FixedSearch;

    #[async_trait]
    impl VectorSearch for FixedSearch {
        async fn retrieve(&self, _query: &str) -> Result<Vec<Document>> {
            Ok(vec![Document::new(
                "Calibration is due monthly.",
                "cal.pdf",
                "https://d/cal",
            )])
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct AgreeableLlm;

    #[async_trait]
    impl LlmProvider for AgreeableLlm {
        async fn generate(&self, _prompt: &ChatPrompt) -> Result<String> {
            Ok("Monthly.".to_string())
        }

        async fn grade(&self, _prompt: &ChatPrompt) -> Result<BinaryScore> {
            Ok(BinaryScore::Yes)
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "agreeable"
        }

        fn model(&self) -> &str {
            "test"
        }
    }

    fn server() -> RagServer {
        let llm = Arc::new(AgreeableLlm);
        let graph = RagGraph::new(Arc::new(FixedSearch), llm.clone(), llm);
        RagServer::with_state(AppState::from_graph(RagConfig::default(), graph))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let server = server();
        let router = server.build_router();

        let health = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        server.state().set_ready(false);
        let ready = router
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_query_endpoint() {
        let router = server().build_router();
        let request = Request::post("/api/query")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"question": "How often is calibration due?"}"#))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["answer"], "Monthly.");
        assert_eq!(body["sources"][0], "cal.pdf");
        assert_eq!(body["links"][0], "https://d/cal");
        assert_eq!(body["error"], false);
        assert_eq!(body["path"].as_array().unwrap().last().unwrap(), "printer");
    }

    #[tokio::test]
    async fn test_query_rejects_empty_question() {
        let router = server().build_router();
        let request = Request::post("/api/query")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"question": "  "}"#))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "invalid_request");
    }

    #[tokio::test]
    async fn test_info_reports_backend() {
        let router = server().build_router();
        let response = router
            .oneshot(Request::get("/api/info").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["name"], "adaptive-rag");
        assert_eq!(body["provider"], "pinecone");
    }
}
