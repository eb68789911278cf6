//! Core types for the adaptive RAG agent

pub mod document;
pub mod grade;
pub mod query;
pub mod response;
pub mod state;

pub use document::Document;
pub use grade::{BinaryScore, GradeAnswer, GradeDocuments, GradeHallucinations, JudgmentKind};
pub use query::QueryRequest;
pub use response::{QueryResponse, RagOutcome};
pub use state::RunState;
