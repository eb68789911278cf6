//! Query request types

use serde::{Deserialize, Serialize};

use crate::config::LoopConfig;
use crate::error::{Error, Result};

use super::state::RunState;

/// Query request for the RAG agent.
///
/// Unset fields fall back to the process configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,

    /// Grade the answer for groundedness and usefulness
    #[serde(default)]
    pub reflection: Option<bool>,

    /// Query rewrites allowed when nothing relevant is retrieved
    #[serde(default)]
    pub retry_count_grade_documents: Option<u32>,

    /// Regenerations allowed after an ungrounded answer
    #[serde(default)]
    pub retry_count_hallucinations: Option<u32>,

    /// Identity used for document permission checks
    #[serde(default)]
    pub user_email: Option<String>,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Enable or disable reflection
    pub fn with_reflection(mut self, reflection: bool) -> Self {
        self.reflection = Some(reflection);
        self
    }

    /// Set both retry budgets
    pub fn with_retries(mut self, grade_documents: u32, hallucinations: u32) -> Self {
        self.retry_count_grade_documents = Some(grade_documents);
        self.retry_count_hallucinations = Some(hallucinations);
        self
    }

    /// Reject requests that cannot start a run
    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(Error::InvalidRequest("question must not be empty".to_string()));
        }
        Ok(())
    }

    /// Build the initial run state, layering request overrides on `defaults`
    pub fn into_run_state(self, defaults: &LoopConfig, default_user_email: &str) -> RunState {
        let user_email = self
            .user_email
            .unwrap_or_else(|| default_user_email.to_string());
        let mut state = RunState::new(self.question, defaults).with_user_email(user_email);
        if let Some(reflection) = self.reflection {
            state = state.with_reflection(reflection);
        }
        if let Some(n) = self.retry_count_grade_documents {
            state = state.with_grade_documents_retries(n);
        }
        if let Some(n) = self.retry_count_hallucinations {
            state = state.with_hallucination_retries(n);
        }
        state
    }
}
