//! Pluggable LLM provider trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse, user_message};
use crate::error::AgentError;

/// Trait for LLM provider backends.
///
/// Implementations handle the transport layer (HTTP, SDK calls, retries)
/// for a specific provider while presenting a uniform interface to agents.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::CompletionService`] on API failures or timeouts.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;

    /// Sends `prompt` as a single user message and returns the reply text.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::CompletionService`] on API failures or timeouts.
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, AgentError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![user_message(prompt)],
            temperature: None,
            max_tokens: None,
            json_mode: false,
            stop: Vec::new(),
        };
        Ok(self.chat(&request).await?.content)
    }
}
