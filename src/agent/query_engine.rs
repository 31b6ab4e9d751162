//! Per-document retrieval and grounded answering.
//!
//! A [`QueryEngine`] owns one document's index. Answering a query embeds
//! it, retrieves the top passages, renders them into a grounding prompt,
//! and asks the responder agent to answer from those passages only.

use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::answer::{Citation, QueryAnswer};
use super::config::AgentConfig;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::template::PromptTemplate;
use super::traits::Agent;
use crate::core::{DocumentSpec, ScoredPassage};
use crate::embedding::Embedder;
use crate::error::AgentError;
use crate::index::VectorIndex;

/// Something that answers a question about one document.
#[async_trait]
pub trait AnswerEngine: Send + Sync {
    /// Answers `query` from the `top_k` most similar passages.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EmbeddingService`], [`AgentError::Retrieval`],
    /// or [`AgentError::Synthesis`]; all are recoverable.
    async fn answer(&self, query: &str, top_k: usize) -> Result<QueryAnswer, AgentError>;
}

/// Agent that answers from a grounding prompt.
pub struct ResponderAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl ResponderAgent {
    /// Creates a new responder agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.answer_max_tokens,
            system_prompt,
        }
    }
}

impl Agent for ResponderAgent {
    fn name(&self) -> &'static str {
        "responder"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Retrieval-augmented answering over one document.
pub struct QueryEngine {
    document: String,
    display_name: String,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    provider: Arc<dyn LlmProvider>,
    responder: ResponderAgent,
    template: PromptTemplate,
    citations: bool,
}

impl QueryEngine {
    /// Creates an engine for `spec` over a loaded index.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] if the answer system prompt cannot render.
    pub fn new(
        spec: &DocumentSpec,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        provider: Arc<dyn LlmProvider>,
        config: &AgentConfig,
        prompts: &PromptSet,
    ) -> Result<Self, AgentError> {
        let system_prompt = prompts.answer_system.render(&[])?;
        let template = if config.citations {
            prompts.answer_cited.clone()
        } else {
            prompts.answer.clone()
        };

        Ok(Self {
            document: spec.id.clone(),
            display_name: spec.name.clone(),
            index,
            embedder,
            provider,
            responder: ResponderAgent::new(config, system_prompt),
            template,
            citations: config.citations,
        })
    }

    /// Document id this engine answers for.
    #[must_use]
    pub fn document(&self) -> &str {
        &self.document
    }

    fn retrieval_error(&self, message: impl Into<String>) -> AgentError {
        AgentError::Retrieval {
            document: self.document.clone(),
            message: message.into(),
        }
    }

    fn synthesis_error(&self, message: impl Into<String>) -> AgentError {
        AgentError::Synthesis {
            scope: self.document.clone(),
            message: message.into(),
        }
    }
}

/// Renders passages as prompt context; numbered as `Source n:` for citations.
fn build_context(passages: &[ScoredPassage], numbered: bool) -> String {
    let mut context = String::new();
    for (i, passage) in passages.iter().enumerate() {
        if i > 0 {
            context.push_str("\n\n");
        }
        if numbered {
            let _ = write!(context, "Source {}:\n{}", i + 1, passage.text());
        } else {
            context.push_str(passage.text());
        }
    }
    context
}

#[async_trait]
impl AnswerEngine for QueryEngine {
    async fn answer(&self, query: &str, top_k: usize) -> Result<QueryAnswer, AgentError> {
        let embedding = self.embedder.embed(query).await?;

        let passages = self
            .index
            .search(&embedding, top_k)
            .map_err(|e| self.retrieval_error(e.to_string()))?;
        if passages.is_empty() {
            return Err(self.retrieval_error("no passages retrieved"));
        }
        debug!(
            document = %self.document,
            retrieved = passages.len(),
            top_score = passages[0].score,
            "retrieved passages"
        );

        let context = build_context(&passages, self.citations);
        let prompt = self.template.render(&[
            ("document", self.display_name.as_str()),
            ("context", context.as_str()),
            ("query", query),
        ])?;

        let response = self
            .responder
            .execute(self.provider.as_ref(), &prompt)
            .await
            .map_err(|e| self.synthesis_error(e.to_string()))?;

        let text = response.content.trim();
        if text.is_empty() {
            return Err(self.synthesis_error("model returned an empty answer"));
        }

        Ok(QueryAnswer {
            document: self.document.clone(),
            text: text.to_string(),
            citations: passages
                .into_iter()
                .enumerate()
                .map(|(i, passage)| Citation {
                    source: i + 1,
                    passage,
                })
                .collect(),
            total_tokens: response.usage.total_tokens,
        })
    }
}
