//! Registry of per-document tools.
//!
//! Each registered document contributes one [`QueryEngineTool`]. Names are
//! unique; lookup order follows registration order.

use std::sync::Arc;

use async_trait::async_trait;

use super::answer::QueryAnswer;
use super::query_engine::AnswerEngine;
use super::tool::{Tool, ToolMetadata, ToolOutput};
use crate::core::DocumentSpec;
use crate::error::AgentError;

/// A document's query engine exposed as a tool.
#[derive(Clone)]
pub struct QueryEngineTool {
    metadata: ToolMetadata,
    label: String,
    engine: Arc<dyn AnswerEngine>,
    top_k: usize,
}

impl std::fmt::Debug for QueryEngineTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngineTool")
            .field("metadata", &self.metadata)
            .field("label", &self.label)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl QueryEngineTool {
    /// Creates a tool from explicit metadata; the label defaults to the name.
    #[must_use]
    pub fn new(metadata: ToolMetadata, engine: Arc<dyn AnswerEngine>, top_k: usize) -> Self {
        Self {
            label: metadata.name.clone(),
            metadata,
            engine,
            top_k,
        }
    }

    /// Creates a tool named by the document id, described by its display
    /// name and description.
    #[must_use]
    pub fn from_spec(spec: &DocumentSpec, engine: Arc<dyn AnswerEngine>, top_k: usize) -> Self {
        let description = format!("{}. {}", spec.name, spec.description);
        let mut tool = Self::new(ToolMetadata::new(&spec.id, description), engine, top_k);
        tool.label.clone_from(&spec.name);
        tool
    }

    /// Human-readable document name used when citing sources.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Answers a query with provenance.
    ///
    /// # Errors
    ///
    /// Propagates the engine's recoverable errors.
    pub async fn query(&self, query: &str) -> Result<QueryAnswer, AgentError> {
        self.engine.answer(query, self.top_k).await
    }
}

#[async_trait]
impl Tool for QueryEngineTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn invoke(&self, input: &str) -> Result<ToolOutput, AgentError> {
        let answer = self.query(input).await?;
        Ok(ToolOutput {
            content: answer.text,
            total_tokens: answer.total_tokens,
        })
    }
}

/// Ordered set of uniquely named document tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<QueryEngineTool>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateName`] if the name is already registered.
    pub fn register(&mut self, tool: QueryEngineTool) -> Result<(), AgentError> {
        if self.get(&tool.metadata.name).is_some() {
            return Err(AgentError::DuplicateName {
                name: tool.metadata.name,
            });
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Tools in registration order.
    #[must_use]
    pub fn list(&self) -> &[QueryEngineTool] {
        &self.tools
    }

    /// Metadata of every tool, in registration order.
    pub fn metadata(&self) -> impl Iterator<Item = &ToolMetadata> {
        self.tools.iter().map(|t| &t.metadata)
    }

    /// Looks up a tool by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&QueryEngineTool> {
        self.tools.iter().find(|t| t.metadata.name == name)
    }

    /// Looks up a tool by model-emitted name: exact first, then trimmed and
    /// ASCII case-insensitive.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&QueryEngineTool> {
        self.get(name).or_else(|| {
            let wanted = name.trim();
            self.tools
                .iter()
                .find(|t| t.metadata.name.eq_ignore_ascii_case(wanted))
        })
    }

    /// Registration index of a tool.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.tools.iter().position(|t| t.metadata.name == name)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticEngine;
    use proptest::prelude::*;

    fn tool(name: &str) -> QueryEngineTool {
        QueryEngineTool::new(
            ToolMetadata::new(name, format!("about {name}")),
            Arc::new(StaticEngine(name.to_string())),
            3,
        )
    }

    #[test]
    fn test_register_preserves_order() {
        let mut registry = ToolRegistry::new();
        for name in ["insurance", "cpa", "tesia"] {
            registry.register(tool(name)).unwrap_or_else(|_| unreachable!());
        }
        let names: Vec<&str> = registry.metadata().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["insurance", "cpa", "tesia"]);
        assert_eq!(registry.position("tesia"), Some(2));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("cpa")).unwrap_or_else(|_| unreachable!());
        let err = registry.register(tool("cpa"));
        assert!(matches!(err, Err(AgentError::DuplicateName { ref name }) if name == "cpa"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_is_exact_resolve_is_lenient() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("iradaoi")).unwrap_or_else(|_| unreachable!());
        assert!(registry.get("IRADAOI").is_none());
        assert!(registry.resolve(" IRADAOI ").is_some());
        assert!(registry.resolve("iradai").is_none());
    }

    #[test]
    fn test_from_spec_uses_id_as_name() {
        let spec = DocumentSpec {
            id: "cpa".to_string(),
            name: "The Consumer Protection Act, 1986".to_string(),
            description: "Consumer disputes.".to_string(),
            index_path: "unused".into(),
        };
        let t = QueryEngineTool::from_spec(&spec, Arc::new(StaticEngine(String::new())), 3);
        assert_eq!(t.metadata().name, "cpa");
        assert!(t.metadata().description.starts_with("The Consumer Protection Act, 1986."));
        assert_eq!(t.label(), "The Consumer Protection Act, 1986");
    }

    #[tokio::test]
    async fn test_invoke_returns_answer_text() {
        let output = tool("tesia").invoke("sickness benefit?").await.unwrap_or_else(|_| unreachable!());
        assert_eq!(output.content, "tesia says: sickness benefit?");
    }

    proptest! {
        #[test]
        fn prop_second_registration_of_any_name_fails(
            names in proptest::collection::btree_set("[a-z]{1,8}", 1..6),
            pick in any::<prop::sample::Index>(),
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let mut registry = ToolRegistry::new();
            for name in &names {
                prop_assert!(registry.register(tool(name)).is_ok());
            }
            let dup = pick.get(&names);
            let is_duplicate = matches!(
                registry.register(tool(dup)),
                Err(AgentError::DuplicateName { .. })
            );
            prop_assert!(is_duplicate);
            prop_assert_eq!(registry.len(), names.len());
        }
    }
}
