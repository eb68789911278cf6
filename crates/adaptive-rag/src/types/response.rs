//! Terminal outcomes and API responses

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the loop's terminal sink emits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RagOutcome {
    /// Final generation plus provenance for every surviving document
    Answer {
        generation: String,
        /// Filenames, one per document
        sources: Vec<String>,
        /// Source links, one per document
        links: Vec<String>,
    },
    /// Terminal error
    Error { message: String },
}

impl RagOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Generation for a successful run
    pub fn generation(&self) -> Option<&str> {
        match self {
            Self::Answer { generation, .. } => Some(generation),
            Self::Error { .. } => None,
        }
    }

    /// Error message for a failed run
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Answer { .. } => None,
            Self::Error { message } => Some(message),
        }
    }
}

/// Response body for `POST /api/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Run identifier
    pub run_id: Uuid,
    /// The generated answer (absent on error)
    pub answer: Option<String>,
    /// Filenames of the documents the answer was built from
    pub sources: Vec<String>,
    /// Links to those documents
    pub links: Vec<String>,
    /// Whether the run ended in an error
    pub error: bool,
    /// Error message (absent on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Nodes visited, in order
    pub path: Vec<String>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl QueryResponse {
    /// Build a response from a terminal outcome
    pub fn from_outcome(
        run_id: Uuid,
        outcome: RagOutcome,
        path: Vec<String>,
        processing_time_ms: u64,
    ) -> Self {
        match outcome {
            RagOutcome::Answer {
                generation,
                sources,
                links,
            } => Self {
                run_id,
                answer: Some(generation),
                sources,
                links,
                error: false,
                error_message: None,
                path,
                processing_time_ms,
            },
            RagOutcome::Error { message } => Self {
                run_id,
                answer: None,
                sources: Vec::new(),
                links: Vec::new(),
                error: true,
                error_message: Some(message),
                path,
                processing_time_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_has_no_provenance() {
        let resp = QueryResponse::from_outcome(
            Uuid::new_v4(),
            RagOutcome::Error {
                message: "nothing relevant".to_string(),
            },
            vec!["retrieve".to_string(), "printer".to_string()],
            12,
        );

        assert!(resp.error);
        assert!(resp.answer.is_none());
        assert!(resp.sources.is_empty());
        assert_eq!(resp.error_message.as_deref(), Some("nothing relevant"));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = RagOutcome::Answer {
            generation: "42".to_string(),
            sources: vec!["a.pdf".to_string()],
            links: vec!["https://x/a".to_string()],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "answer");
        assert_eq!(json["sources"][0], "a.pdf");
    }
}
