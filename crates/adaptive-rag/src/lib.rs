//! adaptive-rag: retrieval-augmented answers with LLM relevance grading and
//! self-reflection
//!
//! A question is answered by retrieving documents from a vector search
//! backend, keeping the ones an LLM grades relevant, generating an answer
//! from them and, optionally, grading that answer for groundedness and
//! usefulness. Failed gradings loop back (query rewrite or regeneration)
//! within fixed retry budgets.

pub mod config;
pub mod error;
pub mod generation;
pub mod graph;
pub mod providers;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use graph::{Node, RagGraph, RunReport};
pub use types::{
    document::Document,
    grade::BinaryScore,
    query::QueryRequest,
    response::{QueryResponse, RagOutcome},
    state::RunState,
};
