//! Error types for multidoc-rs.
//!
//! Each layer has its own `thiserror` enum. [`Error`] unifies them for the
//! CLI boundary; library callers usually match on the layer-specific type.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Persisted index could not be loaded or searched.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Agent pipeline failure.
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// Prompt template failure.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// CLI command failure.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Generic I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or querying a persisted vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index directory or one of its artifacts does not exist.
    #[error("index store not found: {}", path.display())]
    Missing {
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// An artifact exists but could not be decoded.
    #[error("malformed index store at {}: {message}", path.display())]
    Malformed {
        /// Offending artifact.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// Reading an artifact failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Artifact being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Query embedding dimension differs from the indexed vectors.
    #[error("embedding dimension mismatch: index has {expected}, query has {actual}")]
    DimensionMismatch {
        /// Dimension of the stored vectors.
        expected: usize,
        /// Dimension of the query vector.
        actual: usize,
    },
}

/// Errors raised while parsing or rendering prompt templates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A placeholder in the template had no value at render time.
    #[error("template '{template}' is missing a value for placeholder '{{{placeholder}}}'")]
    MissingPlaceholder {
        /// Template name.
        template: String,
        /// Placeholder without a value.
        placeholder: String,
    },

    /// A template does not declare a placeholder its caller requires.
    #[error("template '{template}' does not declare required placeholder '{{{placeholder}}}'")]
    MissingRequired {
        /// Template name.
        template: String,
        /// Placeholder that must appear.
        placeholder: String,
    },

    /// A template uses a placeholder its caller never supplies.
    #[error("template '{template}' uses unknown placeholder '{{{placeholder}}}' (allowed: {allowed})")]
    UnknownPlaceholder {
        /// Template name.
        template: String,
        /// Placeholder outside the allowed set.
        placeholder: String,
        /// Comma-separated allowed names.
        allowed: String,
    },

    /// Template text could not be parsed.
    #[error("template '{template}' is invalid: {message}")]
    Syntax {
        /// Template name.
        template: String,
        /// Parse failure detail.
        message: String,
    },
}

/// Errors raised by the retrieval, planning and agent layers.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A document's index failed to load at startup.
    #[error("failed to load index for document '{document}': {message}")]
    IndexLoad {
        /// Document id.
        document: String,
        /// Load failure detail.
        message: String,
    },

    /// Retrieval against a document index failed.
    #[error("retrieval failed for document '{document}': {message}")]
    Retrieval {
        /// Document id.
        document: String,
        /// Failure detail.
        message: String,
    },

    /// The model could not produce an answer from retrieved context.
    #[error("synthesis failed ({scope}): {message}")]
    Synthesis {
        /// Document id, or `aggregate` for the planner's final synthesis.
        scope: String,
        /// Failure detail.
        message: String,
    },

    /// The embedding service failed.
    #[error("embedding service error: {message}")]
    EmbeddingService {
        /// Failure detail.
        message: String,
    },

    /// The completion service failed.
    #[error("completion service error: {message}")]
    CompletionService {
        /// Failure detail.
        message: String,
        /// HTTP status code, if known.
        status: Option<u16>,
    },

    /// The model's decomposition output could not be used.
    #[error("decomposition failed: {message}")]
    Decomposition {
        /// Failure detail.
        message: String,
        /// Raw model output (empty if the call itself failed).
        content: String,
    },

    /// A tool name is already registered.
    #[error("duplicate tool name: {name}")]
    DuplicateName {
        /// Colliding name.
        name: String,
    },

    /// The agent loop ran out of steps without a final answer.
    #[error("agent stopped after {max_steps} steps without a final answer")]
    MaxStepsExceeded {
        /// Configured step bound.
        max_steps: usize,
    },

    /// Model output matched neither an action nor a final answer.
    #[error("malformed agent output: {message}")]
    MalformedAgentOutput {
        /// Why the output was rejected.
        message: String,
        /// Raw model output.
        content: String,
    },

    /// Prompt rendering failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// No API key was configured.
    #[error("API key not configured (set OPENAI_API_KEY or MULTIDOC_API_KEY)")]
    ApiKeyMissing,

    /// Unknown provider name.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Requested provider.
        name: String,
    },

    /// Invalid configuration value.
    #[error("configuration error: {message}")]
    Configuration {
        /// Failure detail.
        message: String,
    },

    /// Every configured document failed to load.
    #[error("no documents available: every configured index failed to load")]
    NoDocuments,

    /// Pipeline bookkeeping failure (bad input, task join failure).
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Failure detail.
        message: String,
    },
}

impl AgentError {
    /// Stable machine-readable error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::IndexLoad { .. } => "index_load",
            Self::Retrieval { .. } => "retrieval",
            Self::Synthesis { .. } => "synthesis",
            Self::EmbeddingService { .. } => "embedding_service",
            Self::CompletionService { .. } => "completion_service",
            Self::Decomposition { .. } => "decomposition",
            Self::DuplicateName { .. } => "duplicate_name",
            Self::MaxStepsExceeded { .. } => "max_steps_exceeded",
            Self::MalformedAgentOutput { .. } => "malformed_agent_output",
            Self::Template(_) => "template",
            Self::ApiKeyMissing => "api_key_missing",
            Self::UnsupportedProvider { .. } => "unsupported_provider",
            Self::Configuration { .. } => "configuration",
            Self::NoDocuments => "no_documents",
            Self::Orchestration { .. } => "orchestration",
        }
    }

    /// Whether the failure is local to one call and may be retried or skipped.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Retrieval { .. }
                | Self::Synthesis { .. }
                | Self::EmbeddingService { .. }
                | Self::CompletionService { .. }
                | Self::Decomposition { .. }
        )
    }
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not complete.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be rendered.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),

    /// An agent run failed; carries the rendered failure report.
    #[error("{0}")]
    RunFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_kinds() {
        assert_eq!(
            AgentError::MaxStepsExceeded { max_steps: 3 }.kind(),
            "max_steps_exceeded"
        );
        assert_eq!(
            AgentError::DuplicateName {
                name: "x".to_string()
            }
            .kind(),
            "duplicate_name"
        );
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(
            AgentError::Retrieval {
                document: "cpa".to_string(),
                message: "gone".to_string(),
            }
            .is_recoverable()
        );
        assert!(!AgentError::MaxStepsExceeded { max_steps: 1 }.is_recoverable());
        assert!(!AgentError::NoDocuments.is_recoverable());
    }

    #[test]
    fn test_template_error_display() {
        let err = TemplateError::MissingPlaceholder {
            template: "qa".to_string(),
            placeholder: "context".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "template 'qa' is missing a value for placeholder '{context}'"
        );
    }

    #[test]
    fn test_index_error_converts_to_top_level() {
        let err: Error = IndexError::DimensionMismatch {
            expected: 3,
            actual: 2,
        }
        .into();
        assert!(err.to_string().contains("dimension mismatch"));
    }
}
