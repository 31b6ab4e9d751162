//! Agent trait definition.
//!
//! The responder, decomposer, synthesizer, and reasoning agents all
//! implement this trait, which provides a uniform interface for
//! building requests against a provider.

use async_trait::async_trait;

use super::message::{
    ChatMessage, ChatRequest, ChatResponse, TokenUsage, system_message, user_message,
};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

impl From<ChatResponse> for AgentResponse {
    fn from(response: ChatResponse) -> Self {
        Self {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        }
    }
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a specific role (answering, planning, synthesis,
/// reasoning) with a fixed system prompt and model configuration.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Sequences at which generation halts.
    fn stop_sequences(&self) -> Vec<String> {
        Vec::new()
    }

    /// Builds a request from the agent's configuration and the given
    /// conversation, prefixed with the system prompt.
    fn request(&self, conversation: Vec<ChatMessage>) -> ChatRequest {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(system_message(self.system_prompt()));
        messages.extend(conversation);

        ChatRequest {
            model: self.model().to_string(),
            messages,
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
            stop: self.stop_sequences(),
        }
    }

    /// Executes the agent with the given user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or timeouts.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let request = self.request(vec![user_message(user_msg)]);
        let response = provider.chat(&request).await?;
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::Role;

    struct Echo;

    impl Agent for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn model(&self) -> &str {
            "m"
        }
        fn system_prompt(&self) -> &str {
            "be brief"
        }
        fn stop_sequences(&self) -> Vec<String> {
            vec!["STOP".to_string()]
        }
    }

    #[test]
    fn test_request_prepends_system_prompt() {
        let request = Echo.request(vec![user_message("hi")]);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, "be brief");
        assert_eq!(request.messages[1].content, "hi");
        assert_eq!(request.stop, vec!["STOP".to_string()]);
        assert_eq!(request.max_tokens, Some(2048));
        assert!(!request.json_mode);
    }
}
