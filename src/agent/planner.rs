//! Sub-question planner for fan-out/collect answering across documents.
//!
//! Coordinates the full multi-document pipeline: decompose the query into
//! routed sub-questions → validate routing → fan out to document engines →
//! collect sub-answers → synthesize one response.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::answer::{PlannerAnswer, QueryAnswer, SubAnswer, SubQuestion, SubQuestionFailure};
use super::config::AgentConfig;
use super::decomposer::DecomposerAgent;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::registry::ToolRegistry;
use super::synthesizer::{SynthesizerAgent, format_sub_answers};
use super::template::PromptTemplate;
use super::tool::{Tool, ToolMetadata, ToolOutput, describe_tools};
use super::traits::Agent;
use crate::error::AgentError;

/// Maximum accepted query length in bytes.
const MAX_QUERY_LEN: usize = 10_000;

/// Response used when no sub-question could be answered.
pub const NO_ANSWER: &str = "None of the documents could answer this question.";

/// Plans, dispatches and aggregates sub-questions over a [`ToolRegistry`].
pub struct SubQuestionPlanner {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
    decomposer: DecomposerAgent,
    decomposer_user: PromptTemplate,
    synthesizer: SynthesizerAgent,
    synthesizer_user: PromptTemplate,
}

impl SubQuestionPlanner {
    /// Creates a planner over an immutable registry.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] if a system prompt cannot render.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
        prompts: &PromptSet,
    ) -> Result<Self, AgentError> {
        let decomposer = DecomposerAgent::new(&config, prompts.decomposer_system.render(&[])?);
        let synthesizer = SynthesizerAgent::new(&config, prompts.synthesizer_system.render(&[])?);
        Ok(Self {
            provider,
            registry,
            config,
            decomposer,
            decomposer_user: prompts.decomposer_user.clone(),
            synthesizer,
            synthesizer_user: prompts.synthesizer_user.clone(),
        })
    }

    /// The registry sub-questions are routed against.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answers a query across every registered document.
    ///
    /// # Steps
    ///
    /// 1. Decompose the query into routed sub-questions
    /// 2. Drop sub-questions naming unknown tools
    /// 3. Fall back to the whole query on every tool if nothing is routable
    /// 4. Dispatch sub-questions concurrently
    /// 5. Synthesize the successful sub-answers
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] for empty or oversized queries,
    /// [`AgentError::NoDocuments`] for an empty registry,
    /// [`AgentError::Template`] if a prompt cannot render, and
    /// [`AgentError::Synthesis`] if the final synthesis fails.
    pub async fn query(&self, query: &str) -> Result<PlannerAnswer, AgentError> {
        if query.trim().is_empty() {
            return Err(AgentError::Orchestration {
                message: "Query cannot be empty".to_string(),
            });
        }

        if query.len() > MAX_QUERY_LEN {
            return Err(AgentError::Orchestration {
                message: format!(
                    "Query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                    query.len()
                ),
            });
        }

        if self.registry.is_empty() {
            return Err(AgentError::NoDocuments);
        }

        let start = Instant::now();
        let mut total_tokens: u32 = 0;
        let mut errors: Vec<String> = Vec::new();

        // Step 1: Decompose
        let user_msg = self.decomposer_user.render(&[
            ("tools", describe_tools(self.registry.metadata()).as_str()),
            ("query", query),
        ])?;
        let planned = match self
            .decomposer
            .decompose(self.provider.as_ref(), &user_msg)
            .await
        {
            Ok((sub_questions, response)) => {
                total_tokens = total_tokens.saturating_add(response.usage.total_tokens);
                debug!(count = sub_questions.len(), "decomposed query");
                Some(sub_questions)
            }
            Err(e) => {
                warn!(error = %e, "decomposition failed, routing the whole query to every document");
                errors.push(e.to_string());
                None
            }
        };

        // Step 2: Validate routing
        let (mut sub_questions, dropped) = planned.map_or_else(
            || (Vec::new(), Vec::new()),
            |planned| self.validate_routing(planned),
        );

        // Step 3: Fallback
        let used_fallback = sub_questions.is_empty();
        if used_fallback {
            if errors.is_empty() {
                warn!("no routable sub-questions, routing the whole query to every document");
            }
            sub_questions = self
                .registry
                .metadata()
                .map(|m| SubQuestion::new(query, &m.name))
                .collect();
        }

        // Step 4: Fan out
        let outcomes = self.fan_out(&sub_questions).await;

        let mut sub_answers: Vec<SubAnswer> = Vec::new();
        let mut failures: Vec<SubQuestionFailure> = Vec::new();
        for (sub_question, outcome) in sub_questions.iter().zip(outcomes) {
            match outcome {
                Ok((answer, elapsed)) => {
                    total_tokens = total_tokens.saturating_add(answer.total_tokens);
                    sub_answers.push(SubAnswer {
                        sub_question: sub_question.clone(),
                        source_passages: answer.source_passages().cloned().collect(),
                        text: answer.text,
                        elapsed,
                    });
                }
                Err(e) => {
                    warn!(
                        tool = %sub_question.tool_name,
                        error = %e,
                        "sub-question failed"
                    );
                    errors.push(format!("{}: {e}", sub_question.tool_name));
                    failures.push(SubQuestionFailure {
                        sub_question: sub_question.clone(),
                        kind: e.kind(),
                        error: e.to_string(),
                    });
                }
            }
        }

        // Registry order, stable within a tool
        sub_answers.sort_by_key(|a| self.registry.position(&a.sub_question.tool_name));

        // Step 5: Synthesize
        let response = if sub_answers.is_empty() {
            NO_ANSWER.to_string()
        } else {
            let (text, tokens) = self.synthesize(query, &sub_answers).await?;
            total_tokens = total_tokens.saturating_add(tokens);
            text
        };

        info!(
            sub_questions = sub_questions.len(),
            answered = sub_answers.len(),
            failed = failures.len(),
            dropped = dropped.len(),
            used_fallback,
            "planner finished"
        );

        Ok(PlannerAnswer {
            response,
            sub_questions,
            sub_answers,
            failures,
            dropped,
            errors,
            used_fallback,
            total_tokens,
            elapsed: start.elapsed(),
        })
    }

    /// Splits sub-questions into routable ones (with canonical tool names)
    /// and those naming unknown tools.
    fn validate_routing(&self, planned: Vec<SubQuestion>) -> (Vec<SubQuestion>, Vec<SubQuestion>) {
        let mut routable = Vec::with_capacity(planned.len());
        let mut dropped = Vec::new();
        for sub_question in planned {
            match self.registry.resolve(&sub_question.tool_name) {
                Some(tool) => routable.push(SubQuestion::new(
                    sub_question.sub_question,
                    &tool.metadata().name,
                )),
                None => {
                    warn!(
                        tool = %sub_question.tool_name,
                        sub_question = %sub_question.sub_question,
                        "dropping sub-question routed to an unknown tool"
                    );
                    dropped.push(sub_question);
                }
            }
        }
        (routable, dropped)
    }

    /// Dispatches sub-questions concurrently, bounded by `max_concurrency`.
    ///
    /// Results are returned in input order.
    async fn fan_out(
        &self,
        sub_questions: &[SubQuestion],
    ) -> Vec<Result<(QueryAnswer, std::time::Duration), AgentError>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut handles = Vec::with_capacity(sub_questions.len());

        for sub_question in sub_questions {
            let sem = Arc::clone(&semaphore);
            let tool = self.registry.get(&sub_question.tool_name).cloned();
            let question = sub_question.sub_question.clone();
            let tool_name = sub_question.tool_name.clone();

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire().await.map_err(|e| AgentError::Orchestration {
                    message: format!("Semaphore acquire failed: {e}"),
                })?;
                let tool = tool.ok_or_else(|| AgentError::Orchestration {
                    message: format!("Tool not registered: {tool_name}"),
                })?;

                let start = Instant::now();
                debug!(tool = %tool_name, question = %question, "dispatching sub-question");
                let answer = tool.query(&question).await?;
                Ok((answer, start.elapsed()))
            });

            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => results.push(Err(AgentError::Orchestration {
                    message: format!("Task join failed: {e}"),
                })),
            }
        }
        results
    }

    /// Synthesizes sub-answers into a final response.
    async fn synthesize(
        &self,
        query: &str,
        sub_answers: &[SubAnswer],
    ) -> Result<(String, u32), AgentError> {
        let answers = format_sub_answers(sub_answers, |name| {
            self.registry
                .get(name)
                .map_or_else(|| name.to_string(), |t| t.label().to_string())
        });
        let user_msg = self
            .synthesizer_user
            .render(&[("query", query), ("answers", answers.as_str())])?;

        let synthesis_error = |message: String| AgentError::Synthesis {
            scope: "aggregate".to_string(),
            message,
        };

        let response = self
            .synthesizer
            .execute(self.provider.as_ref(), &user_msg)
            .await
            .map_err(|e| synthesis_error(e.to_string()))?;

        let text = response.content.trim();
        if text.is_empty() {
            return Err(synthesis_error("model returned an empty answer".to_string()));
        }
        Ok((text.to_string(), response.usage.total_tokens))
    }
}

impl std::fmt::Debug for SubQuestionPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubQuestionPlanner")
            .field("provider", &self.provider.name())
            .field("registry", &self.registry)
            .field("max_concurrency", &self.config.max_concurrency)
            .finish_non_exhaustive()
    }
}

/// The planner exposed to the reasoning agent as a single tool.
#[derive(Debug, Clone)]
pub struct PlannerTool {
    metadata: ToolMetadata,
    planner: Arc<SubQuestionPlanner>,
}

impl PlannerTool {
    /// Default tool name shown to the reasoning agent.
    pub const NAME: &'static str = "legal_documents";

    /// Wraps a planner; the description lists every document it covers.
    #[must_use]
    pub fn new(planner: Arc<SubQuestionPlanner>) -> Self {
        let documents = planner
            .registry()
            .list()
            .iter()
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join("; ");
        let description = format!(
            "Useful for when you want to answer questions about these documents: {documents}. \
             The input to this tool should be a complete English sentence. Works best if you \
             pass the entire question through, articulated as a complete question."
        );
        Self {
            metadata: ToolMetadata::new(Self::NAME, description),
            planner,
        }
    }

    /// The wrapped planner.
    #[must_use]
    pub fn planner(&self) -> &SubQuestionPlanner {
        &self.planner
    }
}

#[async_trait]
impl Tool for PlannerTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn invoke(&self, input: &str) -> Result<ToolOutput, AgentError> {
        let answer = self.planner.query(input).await?;
        Ok(ToolOutput {
            content: answer.response,
            total_tokens: answer.total_tokens,
        })
    }
}
