//! Structured yes/no judgments returned by the reflection LLM

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Binary grade. Only `yes` and `no` are accepted (any case, surrounding
/// whitespace ignored); everything else is rejected where the LLM reply is
/// parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum BinaryScore {
    Yes,
    No,
}

impl BinaryScore {
    pub fn is_yes(self) -> bool {
        matches!(self, Self::Yes)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

impl FromStr for BinaryScore {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            other => Err(Error::Grade(format!("expected 'yes' or 'no', got '{}'", other))),
        }
    }
}

impl TryFrom<String> for BinaryScore {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BinaryScore> for &'static str {
    fn from(score: BinaryScore) -> Self {
        score.as_str()
    }
}

impl fmt::Display for BinaryScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relevance of a retrieved document to the question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeDocuments {
    /// Documents are relevant to the question, 'yes' or 'no'
    pub binary_score: BinaryScore,
}

/// Whether a generation is grounded in the retrieved facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeHallucinations {
    /// Answer is grounded in the facts, 'yes' or 'no'
    pub binary_score: BinaryScore,
}

/// Whether a generation addresses the question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeAnswer {
    /// Answer addresses the question, 'yes' or 'no'
    pub binary_score: BinaryScore,
}

/// A structured judgment record the reflection LLM replies with
pub trait Judgment: DeserializeOwned {
    /// Meaning of the `binary_score` field, given to the model in the schema
    const DESCRIPTION: &'static str;

    fn binary_score(&self) -> BinaryScore;
}

impl Judgment for GradeDocuments {
    const DESCRIPTION: &'static str = "Documents are relevant to the question, 'yes' or 'no'";

    fn binary_score(&self) -> BinaryScore {
        self.binary_score
    }
}

impl Judgment for GradeHallucinations {
    const DESCRIPTION: &'static str = "Answer is grounded in the facts, 'yes' or 'no'";

    fn binary_score(&self) -> BinaryScore {
        self.binary_score
    }
}

impl Judgment for GradeAnswer {
    const DESCRIPTION: &'static str = "Answer addresses the question, 'yes' or 'no'";

    fn binary_score(&self) -> BinaryScore {
        self.binary_score
    }
}

/// Which judgment a grading prompt asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgmentKind {
    /// Parsed as `GradeDocuments`
    DocumentRelevance,
    /// Parsed as `GradeHallucinations`
    Groundedness,
    /// Parsed as `GradeAnswer`
    AnswersQuestion,
}

impl JudgmentKind {
    fn description(self) -> &'static str {
        match self {
            Self::DocumentRelevance => GradeDocuments::DESCRIPTION,
            Self::Groundedness => GradeHallucinations::DESCRIPTION,
            Self::AnswersQuestion => GradeAnswer::DESCRIPTION,
        }
    }

    /// JSON schema sent to the model to constrain the reply
    pub fn schema(self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "binary_score": {
                    "type": "string",
                    "enum": ["yes", "no"],
                    "description": self.description()
                }
            },
            "required": ["binary_score"]
        })
    }

    /// Parse a structured reply into this judgment's record
    pub fn parse_reply(self, reply: &str) -> Result<BinaryScore> {
        match self {
            Self::DocumentRelevance => parse_judgment::<GradeDocuments>(reply),
            Self::Groundedness => parse_judgment::<GradeHallucinations>(reply),
            Self::AnswersQuestion => parse_judgment::<GradeAnswer>(reply),
        }
    }
}

/// Parse a reply of the form `{"binary_score": "yes"}` into `J`
pub fn parse_judgment<J: Judgment>(reply: &str) -> Result<BinaryScore> {
    let reply = reply.trim();
    let judgment: J =
        serde_json::from_str(reply).map_err(|e| Error::Grade(format!("{}: {}", e, reply)))?;
    Ok(judgment.binary_score())
}
