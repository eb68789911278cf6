//! Per-query run state threaded through the grading loop

use serde::Serialize;
use uuid::Uuid;

use super::document::Document;
use crate::config::LoopConfig;

/// Mutable state for one question.
///
/// Each run owns its state outright; nothing in here is shared between
/// concurrent queries.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    /// Run identifier used in logs
    pub run_id: Uuid,
    /// Question as submitted
    pub original_question: String,
    /// Current question (replaced by query rewrites)
    pub question: String,
    /// Identity used for document permission checks
    pub user_email: String,
    /// Retrieved documents, relevance-filtered in place
    pub documents: Vec<Document>,
    /// Latest generated answer
    pub generation: Option<String>,
    /// Remaining query rewrites
    pub retry_count_grade_documents: u32,
    /// Remaining regenerations after an ungrounded answer
    pub retry_count_hallucinations: u32,
    /// Grade the generation before returning it
    pub reflection: bool,
    /// Terminal error flag
    pub error: bool,
    /// Message for a terminal error
    pub error_message: String,
}

impl RunState {
    /// Fresh state with the budgets from `config`
    pub fn new(question: impl Into<String>, config: &LoopConfig) -> Self {
        let question = question.into();
        Self {
            run_id: Uuid::new_v4(),
            original_question: question.clone(),
            question,
            user_email: String::new(),
            documents: Vec::new(),
            generation: None,
            retry_count_grade_documents: config.retry_count_grade_documents,
            retry_count_hallucinations: config.retry_count_hallucinations,
            reflection: config.reflection,
            error: false,
            error_message: String::new(),
        }
    }

    /// Set the asking user's identity
    pub fn with_user_email(mut self, user_email: impl Into<String>) -> Self {
        self.user_email = user_email.into();
        self
    }

    /// Override the query-rewrite budget
    pub fn with_grade_documents_retries(mut self, retries: u32) -> Self {
        self.retry_count_grade_documents = retries;
        self
    }

    /// Override the regeneration budget
    pub fn with_hallucination_retries(mut self, retries: u32) -> Self {
        self.retry_count_hallucinations = retries;
        self
    }

    /// Enable or disable reflection
    pub fn with_reflection(mut self, reflection: bool) -> Self {
        self.reflection = reflection;
        self
    }

    /// Record a terminal error
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = true;
        self.error_message = message.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_loop_budgets() {
        let config = LoopConfig {
            retry_count_grade_documents: 2,
            retry_count_hallucinations: 5,
            reflection: true,
            ..LoopConfig::default()
        };
        let state = RunState::new("what is the leave policy?", &config);

        assert_eq!(state.question, state.original_question);
        assert_eq!(state.retry_count_grade_documents, 2);
        assert_eq!(state.retry_count_hallucinations, 5);
        assert!(state.reflection);
        assert!(!state.error);
        assert!(state.generation.is_none());
    }

    #[test]
    fn test_fail_sets_error() {
        let mut state = RunState::new("q", &LoopConfig::default());
        state.fail("boom");
        assert!(state.error);
        assert_eq!(state.error_message, "boom");
    }
}
