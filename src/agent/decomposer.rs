//! Decomposition agent.
//!
//! Splits a compound query into [`SubQuestion`]s, each tagged with the
//! name of the document tool that should answer it.

use serde::Deserialize;

use super::answer::SubQuestion;
use super::config::AgentConfig;
use super::provider::LlmProvider;
use super::traits::{Agent, AgentResponse};
use crate::error::AgentError;

/// Accepted shapes of decomposition output.
#[derive(Deserialize)]
#[serde(untagged)]
enum Decomposition {
    Wrapped {
        #[serde(alias = "sub_questions", alias = "questions")]
        items: Vec<SubQuestion>,
    },
    Bare(Vec<SubQuestion>),
}

/// Agent that plans sub-questions for a query.
pub struct DecomposerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl DecomposerAgent {
    /// Creates a new decomposer agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.decomposer_max_tokens,
            system_prompt,
        }
    }

    /// Executes the agent and parses its sub-questions.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Decomposition`] if the completion call fails or
    /// the output cannot be parsed.
    pub async fn decompose(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<(Vec<SubQuestion>, AgentResponse), AgentError> {
        let response = self
            .execute(provider, user_msg)
            .await
            .map_err(|e| AgentError::Decomposition {
                message: format!("completion failed: {e}"),
                content: String::new(),
            })?;
        let sub_questions = Self::parse_sub_questions(&response.content)?;
        Ok((sub_questions, response))
    }

    /// Parses the agent's JSON response into sub-questions.
    ///
    /// Items with a blank question are skipped.
    fn parse_sub_questions(content: &str) -> Result<Vec<SubQuestion>, AgentError> {
        let trimmed = content.trim();

        // Handle markdown code blocks
        let json_str = if trimmed.starts_with("```") {
            trimmed
                .trim_start_matches("```json")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim()
        } else {
            trimmed
        };

        let parsed: Decomposition =
            serde_json::from_str(json_str).map_err(|e| AgentError::Decomposition {
                message: format!("failed to parse sub-questions: {e}"),
                content: content.to_string(),
            })?;

        let items = match parsed {
            Decomposition::Wrapped { items } | Decomposition::Bare(items) => items,
        };

        Ok(items
            .into_iter()
            .filter(|q| !q.sub_question.trim().is_empty())
            .map(|q| SubQuestion::new(q.sub_question.trim(), q.tool_name.trim()))
            .collect())
    }
}

impl Agent for DecomposerAgent {
    fn name(&self) -> &'static str {
        "decomposer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
