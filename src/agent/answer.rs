//! Data types for per-document answers and planner results.
//!
//! These types carry answer text together with the passages and
//! sub-questions it came from, so callers can show provenance.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::ScoredPassage;

/// A retrieved passage with the source number shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based source number (`[n]` in cited answers).
    pub source: usize,
    /// The passage and its score.
    #[serde(flatten)]
    pub passage: ScoredPassage,
}

/// Answer from one document's query engine.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    /// Document id the answer came from.
    pub document: String,
    /// Answer text.
    pub text: String,
    /// Retrieved passages, in retrieval order.
    pub citations: Vec<Citation>,
    /// Tokens consumed producing the answer.
    pub total_tokens: u32,
}

impl QueryAnswer {
    /// Retrieved passages in retrieval order.
    pub fn source_passages(&self) -> impl Iterator<Item = &ScoredPassage> {
        self.citations.iter().map(|c| &c.passage)
    }
}

/// A sub-question routed to one document tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    /// Self-contained question text.
    #[serde(alias = "question")]
    pub sub_question: String,
    /// Name of the tool that should answer it.
    #[serde(alias = "tool")]
    pub tool_name: String,
}

impl SubQuestion {
    /// Creates a sub-question.
    #[must_use]
    pub fn new(sub_question: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            sub_question: sub_question.into(),
            tool_name: tool_name.into(),
        }
    }
}

/// A successfully answered sub-question.
#[derive(Debug, Clone, Serialize)]
pub struct SubAnswer {
    /// The question that was asked.
    pub sub_question: SubQuestion,
    /// Answer text from the document engine.
    pub text: String,
    /// Passages the answer was grounded on, with scores.
    pub source_passages: Vec<ScoredPassage>,
    /// Time taken by this dispatch.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

/// A sub-question whose dispatch failed.
#[derive(Debug, Clone, Serialize)]
pub struct SubQuestionFailure {
    /// The question that was asked.
    pub sub_question: SubQuestion,
    /// Stable error kind.
    pub kind: &'static str,
    /// Rendered error message.
    pub error: String,
}

/// Answers grouped by the tool that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct SourceGroup<'a> {
    /// Tool (document) name.
    pub tool_name: &'a str,
    /// Sub-answers from this tool.
    pub answers: Vec<&'a SubAnswer>,
}

/// Final result from the sub-question planner.
#[derive(Debug, Clone, Serialize)]
pub struct PlannerAnswer {
    /// Synthesized answer.
    pub response: String,
    /// Sub-questions that were dispatched.
    pub sub_questions: Vec<SubQuestion>,
    /// Successful sub-answers, in registry order.
    pub sub_answers: Vec<SubAnswer>,
    /// Dispatches that failed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SubQuestionFailure>,
    /// Sub-questions dropped for naming an unknown tool.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<SubQuestion>,
    /// Rendered error messages (decomposition and dispatch).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Whether the whole query was routed to every tool.
    pub used_fallback: bool,
    /// Total tokens consumed.
    pub total_tokens: u32,
    /// Total elapsed time.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

impl PlannerAnswer {
    /// Groups sub-answers by tool, preserving sub-answer order.
    #[must_use]
    pub fn sources(&self) -> Vec<SourceGroup<'_>> {
        let mut groups: Vec<SourceGroup<'_>> = Vec::new();
        for answer in &self.sub_answers {
            let name = answer.sub_question.tool_name.as_str();
            match groups.iter_mut().find(|g| g.tool_name == name) {
                Some(group) => group.answers.push(answer),
                None => groups.push(SourceGroup {
                    tool_name: name,
                    answers: vec![answer],
                }),
            }
        }
        groups
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) fn serialize_duration<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}
