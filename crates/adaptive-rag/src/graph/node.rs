//! Nodes of the retrieve/grade/generate loop
//!
//! Each async node performs exactly one kind of outbound call and mutates the
//! run state; routing decisions are plain functions over the state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::{LlmProvider, VectorSearch};
use crate::storage::StorageService;
use crate::types::document::join_contents;
use crate::types::{Document, RagOutcome, RunState};

use super::{DECIDE_TO_GENERATE_ERROR, HALLUCINATION_ERROR, NO_ANSWER_ERROR};

/// Loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Retrieve,
    GradeDocuments,
    DecideToGenerate,
    TransformQuery,
    Generate,
    #[serde(rename = "grade_generation_v_documents_and_question")]
    GradeGeneration,
    Printer,
}

impl Node {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieve => "retrieve",
            Self::GradeDocuments => "grade_documents",
            Self::DecideToGenerate => "decide_to_generate",
            Self::TransformQuery => "transform_query",
            Self::Generate => "generate",
            Self::GradeGeneration => "grade_generation_v_documents_and_question",
            Self::Printer => "printer",
        }
    }

    /// Terminal sink
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Printer)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch documents for the current question, then drop any the user may not
/// read when a storage service is configured.
pub async fn retrieve(
    retriever: &dyn VectorSearch,
    storage: Option<&dyn StorageService>,
    state: &mut RunState,
) -> Result<()> {
    let mut documents = retriever.retrieve(&state.question).await?;
    tracing::info!("Retrieved {} documents from {}", documents.len(), retriever.name());

    if let Some(storage) = storage {
        documents = storage
            .validate_permissions(documents, &state.user_email)
            .await?;
        tracing::debug!("{} documents after {} permission check", documents.len(), storage.name());
    }

    state.documents = documents;
    Ok(())
}

/// Keep only documents the grader calls relevant, in their original order
pub async fn grade_documents(
    grader: &dyn LlmProvider,
    question: &str,
    documents: Vec<Document>,
) -> Result<Vec<Document>> {
    let total = documents.len();
    let mut filtered = Vec::with_capacity(total);

    for document in documents {
        let prompt = PromptBuilder::grade_document(question, &document.content);
        if grader.grade(&prompt).await?.is_yes() {
            filtered.push(document);
        } else {
            tracing::debug!("Document {} graded not relevant", document.filename);
        }
    }

    tracing::info!("{}/{} documents graded relevant", filtered.len(), total);
    Ok(filtered)
}

/// Route after grading: exhausted budget, rewrite, or generate.
///
/// The budget check comes first, so a zero budget ends the run even when
/// relevant documents were found.
pub fn decide_to_generate(state: &mut RunState) -> Node {
    if state.retry_count_grade_documents == 0 {
        state.fail(DECIDE_TO_GENERATE_ERROR);
        Node::Printer
    } else if state.documents.is_empty() {
        state.retry_count_grade_documents -= 1;
        tracing::info!(
            "No relevant documents, rewriting query ({} rewrites left)",
            state.retry_count_grade_documents
        );
        Node::TransformQuery
    } else {
        Node::Generate
    }
}

/// Rewrite the question for better retrieval
pub async fn transform_query(llm: &dyn LlmProvider, state: &mut RunState) -> Result<()> {
    let prompt = PromptBuilder::transform_query(&state.question);
    let rewritten = llm.generate(&prompt).await?;

    if rewritten.trim().is_empty() {
        return Err(Error::llm("query rewrite returned an empty question"));
    }

    tracing::info!("Rewrote question: \"{}\" -> \"{}\"", state.question, rewritten);
    state.question = rewritten;
    Ok(())
}

/// Generate an answer from the surviving documents
pub async fn generate(llm: &dyn LlmProvider, state: &mut RunState) -> Result<()> {
    let context = join_contents(&state.documents);
    let prompt = PromptBuilder::generate(&state.question, &context);
    let generation = llm.generate(&prompt).await?;

    tracing::debug!("Generated {} chars", generation.len());
    state.generation = Some(generation);
    Ok(())
}

/// Route after generation: grade it when reflection is on
pub fn reflection_validator(state: &RunState) -> Node {
    if state.reflection {
        Node::GradeGeneration
    } else {
        Node::Printer
    }
}

/// Grade the generation: grounded in the documents, then answers the
/// question. Only ungrounded answers are retried.
pub async fn grade_generation_v_documents_and_question(
    grader: &dyn LlmProvider,
    state: &mut RunState,
) -> Result<Node> {
    let generation = state
        .generation
        .as_deref()
        .ok_or_else(|| Error::internal("no generation to grade"))?;

    let facts = join_contents(&state.documents);
    let grounded = grader
        .grade(&PromptBuilder::grade_hallucinations(&facts, generation))
        .await?;

    if !grounded.is_yes() {
        if state.retry_count_hallucinations == 0 {
            state.fail(HALLUCINATION_ERROR);
            return Ok(Node::Printer);
        }
        state.retry_count_hallucinations -= 1;
        tracing::info!(
            "Generation not grounded, regenerating ({} retries left)",
            state.retry_count_hallucinations
        );
        return Ok(Node::Generate);
    }

    let answers = grader
        .grade(&PromptBuilder::grade_answer(&state.question, generation))
        .await?;

    if answers.is_yes() {
        Ok(Node::Printer)
    } else {
        tracing::info!("Generation grounded but does not answer the question");
        state.fail(NO_ANSWER_ERROR);
        Ok(Node::Printer)
    }
}

/// Terminal sink: error message, or generation plus provenance
pub fn printer(state: &RunState) -> RagOutcome {
    if state.error {
        return RagOutcome::Error {
            message: state.error_message.clone(),
        };
    }

    match &state.generation {
        Some(generation) => RagOutcome::Answer {
            generation: generation.clone(),
            sources: state.documents.iter().map(|d| d.filename.clone()).collect(),
            links: state.documents.iter().map(|d| d.source.clone()).collect(),
        },
        None => RagOutcome::Error {
            message: "run ended without a generation".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoopConfig;

    fn state(grade_retries: u32) -> RunState {
        RunState::new("How often is calibration due?", &LoopConfig::default())
            .with_grade_documents_retries(grade_retries)
    }

    fn doc(name: &str) -> Document {
        Document::new(format!("content of {}", name), name, format!("https://d/{}", name))
    }

    #[test]
    fn test_decide_zero_budget_is_terminal_even_with_documents() {
        let mut s = state(0);
        s.documents = vec![doc("a.pdf")];

        assert_eq!(decide_to_generate(&mut s), Node::Printer);
        assert!(s.error);
        assert_eq!(s.error_message, DECIDE_TO_GENERATE_ERROR);
    }

    #[test]
    fn test_decide_empty_documents_decrements() {
        let mut s = state(2);

        assert_eq!(decide_to_generate(&mut s), Node::TransformQuery);
        assert_eq!(s.retry_count_grade_documents, 1);
        assert!(!s.error);
    }

    #[test]
    fn test_decide_generate_keeps_budget() {
        let mut s = state(1);
        s.documents = vec![doc("a.pdf")];

        assert_eq!(decide_to_generate(&mut s), Node::Generate);
        assert_eq!(s.retry_count_grade_documents, 1);
    }

    #[test]
    fn test_reflection_validator() {
        let s = state(1);
        assert_eq!(reflection_validator(&s), Node::Printer);
        assert_eq!(reflection_validator(&s.with_reflection(true)), Node::GradeGeneration);
    }

    #[test]
    fn test_printer_provenance() {
        let mut s = state(1);
        s.documents = vec![doc("a.pdf"), doc("b.pdf")];
        s.generation = Some("Monthly.".to_string());

        assert_eq!(
            printer(&s),
            RagOutcome::Answer {
                generation: "Monthly.".to_string(),
                sources: vec!["a.pdf".to_string(), "b.pdf".to_string()],
                links: vec!["https://d/a.pdf".to_string(), "https://d/b.pdf".to_string()],
            }
        );
    }

    #[test]
    fn test_printer_error_wins_over_generation() {
        let mut s = state(1);
        s.generation = Some("stale".to_string());
        s.fail("grading failed");

        assert_eq!(
            printer(&s),
            RagOutcome::Error {
                message: "grading failed".to_string()
            }
        );
    }

    #[test]
    fn test_node_names() {
        assert_eq!(Node::GradeGeneration.to_string(), "grade_generation_v_documents_and_question");
        assert_eq!(
            serde_json::to_string(&Node::TransformQuery).unwrap(),
            "\"transform_query\""
        );
        assert!(Node::Printer.is_terminal());
    }
}
