//! Multi-document question answering.
//!
//! Provides an LLM-powered workflow that routes compound questions across
//! per-document query engines and reasons over the aggregated answers.
//! Uses a pluggable provider abstraction backed by OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! User query → ReasoningAgent (Thought → Action → Observation)
//!   └── PlannerTool → SubQuestionPlanner
//!         ├── DecomposerAgent (sub-questions routed to document tools)
//!         ├── Fan-out → N concurrent QueryEngineTools
//!         │   └── Embed → search index → ResponderAgent → QueryAnswer
//!         ├── Collect sub-answers with provenance
//!         └── SynthesizerAgent → aggregated answer
//! ```

pub mod answer;
pub mod client;
pub mod config;
pub mod decomposer;
pub mod message;
pub mod pipeline;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod query_engine;
pub mod react;
pub mod registry;
pub mod synthesizer;
pub mod template;
pub mod tool;
pub mod traits;

// Re-export key types
pub use answer::{Citation, PlannerAnswer, QueryAnswer, SubAnswer, SubQuestion, SubQuestionFailure};
pub use config::AgentConfig;
pub use decomposer::DecomposerAgent;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use pipeline::{LoadFailure, Pipeline, load_indexes};
pub use planner::{PlannerTool, SubQuestionPlanner};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use query_engine::{AnswerEngine, QueryEngine};
pub use react::{AgentRun, AgentStep, ReactOutput, ReasoningAgent, RunFailure};
pub use registry::{QueryEngineTool, ToolRegistry};
pub use synthesizer::SynthesizerAgent;
pub use template::PromptTemplate;
pub use tool::{Tool, ToolMetadata, ToolOutput};
pub use traits::{Agent, AgentResponse};
