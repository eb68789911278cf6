//! Retrieved document type

use serde::{Deserialize, Serialize};

/// A document returned by a vector search backend.
///
/// `filename` and `source` are provenance and are passed through to the
/// caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Text used for grading and generation
    pub content: String,
    /// Display name of the originating file
    pub filename: String,
    /// Link to the originating file
    pub source: String,
}

impl Document {
    /// Create a document
    pub fn new(
        content: impl Into<String>,
        filename: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            filename: filename.into(),
            source: source.into(),
        }
    }
}

/// Join document contents into a single generation context
pub fn join_contents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
