//! The retrieve → grade → generate → reflect loop
//!
//! ```text
//! retrieve → grade_documents → decide_to_generate ─┬→ transform_query → retrieve
//!                                                  ├→ generate ─┬→ printer
//!                                                  │            └→ grade_generation ─┬→ generate
//!                                                  │                                 └→ printer
//!                                                  └→ printer
//! ```
//!
//! Two independent budgets bound the loops: query rewrites
//! (`retry_count_grade_documents`) and regenerations
//! (`retry_count_hallucinations`). Reaching zero on either ends the run with
//! an error at the printer.

pub mod node;
pub mod runner;

pub use node::Node;
pub use runner::{RagGraph, RunReport};

/// No relevant documents after the rewrite budget was spent
pub const DECIDE_TO_GENERATE_ERROR: &str =
    "I could not find documents relevant to your question. Please try rephrasing it.";

/// Grounded answer that does not address the question
pub const NO_ANSWER_ERROR: &str = "The available documents do not answer your question.";

/// Regeneration budget spent on ungrounded answers
pub const HALLUCINATION_ERROR: &str =
    "I could not generate an answer grounded in the available documents.";

/// Runner step limit reached
pub const STEP_LIMIT_ERROR: &str = "The request exceeded the maximum number of steps.";
