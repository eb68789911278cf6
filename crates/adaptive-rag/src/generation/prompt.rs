//! Prompt templates for grading, rewriting and generation

use crate::types::grade::JudgmentKind;

/// A system/user message pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    /// Set on grading prompts; selects the reply record
    pub judgment: Option<JudgmentKind>,
}

const GRADE_DOCUMENTS_SYSTEM: &str = "You are a grader assessing the relevance of a retrieved document to a user question. \
If the document contains keywords or meaning related to the question, grade it as relevant. \
This is not a stringent test; the goal is to filter out erroneous retrievals. \
Reply with a binary score 'yes' or 'no' indicating whether the document is relevant to the question.";

const GRADE_HALLUCINATIONS_SYSTEM: &str = "You are a grader assessing whether an LLM generation is grounded in and supported by a set of retrieved facts. \
Reply with a binary score 'yes' or 'no'. 'yes' means the answer is grounded in the facts.";

const GRADE_ANSWER_SYSTEM: &str = "You are a grader assessing whether an answer addresses and resolves a question. \
Reply with a binary score 'yes' or 'no'. 'yes' means the answer resolves the question.";

const TRANSFORM_QUERY_SYSTEM: &str = "You are a question rewriter that turns an input question into a better version optimized \
for vector store retrieval. Reason about the underlying semantic intent of the input. \
Reply with the rewritten question only.";

const GENERATE_SYSTEM: &str = "You are an assistant for question-answering tasks. \
Use the retrieved context to answer the question. If you don't know the answer, say that you don't know. \
Use three sentences maximum and keep the answer concise.";

/// Prompt builder for the RAG loop
pub struct PromptBuilder;

impl PromptBuilder {
    /// Relevance grading of one document
    pub fn grade_document(question: &str, document: &str) -> ChatPrompt {
        ChatPrompt {
            system: GRADE_DOCUMENTS_SYSTEM.to_string(),
            user: format!(
                "Retrieved document: \n\n {} \n\n User question: {}",
                document, question
            ),
            judgment: Some(JudgmentKind::DocumentRelevance),
        }
    }

    /// Groundedness of a generation against the retrieved facts
    pub fn grade_hallucinations(facts: &str, generation: &str) -> ChatPrompt {
        ChatPrompt {
            system: GRADE_HALLUCINATIONS_SYSTEM.to_string(),
            user: format!(
                "Set of facts: \n\n {} \n\n LLM generation: {}",
                facts, generation
            ),
            judgment: Some(JudgmentKind::Groundedness),
        }
    }

    /// Whether a generation answers the question
    pub fn grade_answer(question: &str, generation: &str) -> ChatPrompt {
        ChatPrompt {
            system: GRADE_ANSWER_SYSTEM.to_string(),
            user: format!(
                "User question: \n\n {} \n\n LLM generation: {}",
                question, generation
            ),
            judgment: Some(JudgmentKind::AnswersQuestion),
        }
    }

    /// Question rewrite for better retrieval
    pub fn transform_query(question: &str) -> ChatPrompt {
        ChatPrompt {
            system: TRANSFORM_QUERY_SYSTEM.to_string(),
            user: format!(
                "Here is the initial question: \n\n {} \n Formulate an improved question.",
                question
            ),
            judgment: None,
        }
    }

    /// Answer generation over the joined document contents
    pub fn generate(question: &str, context: &str) -> ChatPrompt {
        ChatPrompt {
            system: GENERATE_SYSTEM.to_string(),
            user: format!(
                "Question: {question} \nContext: {context} \nAnswer:",
                question = question,
                context = context
            ),
            judgment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_document_includes_both_inputs() {
        let prompt = PromptBuilder::grade_document("who signs off?", "The QA lead signs off.");
        assert!(prompt.user.contains("who signs off?"));
        assert!(prompt.user.contains("The QA lead signs off."));
        assert!(prompt.system.contains("'yes' or 'no'"));
        assert_eq!(prompt.judgment, Some(JudgmentKind::DocumentRelevance));
    }

    #[test]
    fn test_judgment_tags() {
        assert_eq!(
            PromptBuilder::grade_hallucinations("facts", "gen").judgment,
            Some(JudgmentKind::Groundedness)
        );
        assert_eq!(
            PromptBuilder::grade_answer("q?", "gen").judgment,
            Some(JudgmentKind::AnswersQuestion)
        );
        assert_eq!(PromptBuilder::transform_query("q?").judgment, None);
    }

    #[test]
    fn test_generate_prompt_layout() {
        let prompt = PromptBuilder::generate("q?", "ctx");
        assert_eq!(prompt.user, "Question: q? \nContext: ctx \nAnswer:");
        assert_eq!(prompt.judgment, None);
    }
}
