//! Tools callable by the planner and the reasoning agent.
//!
//! A tool has a name, a description shown to the model, and an async
//! `invoke` taking a natural-language input.

use std::fmt::Write;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Name and description of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Unique name the model uses to select the tool.
    pub name: String,
    /// What the tool knows about, shown to the model.
    pub description: String,
}

impl ToolMetadata {
    /// Creates tool metadata.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Output of a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Text handed back to the caller as the observation.
    pub content: String,
    /// Tokens the tool consumed.
    pub total_tokens: u32,
}

/// A named, described callable.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name and description.
    fn metadata(&self) -> &ToolMetadata;

    /// Invokes the tool with a natural-language input.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the tool cannot produce an answer.
    async fn invoke(&self, input: &str) -> Result<ToolOutput, AgentError>;
}

/// Renders one `name: description` line per tool.
#[must_use]
pub fn describe_tools<'a>(tools: impl IntoIterator<Item = &'a ToolMetadata>) -> String {
    let mut out = String::new();
    for (i, tool) in tools.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{}: {}", tool.name, tool.description);
    }
    out
}

/// Renders tool names as a comma-separated list.
#[must_use]
pub fn tool_names<'a>(tools: impl IntoIterator<Item = &'a ToolMetadata>) -> String {
    tools
        .into_iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
