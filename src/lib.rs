//! # multidoc-rs
//!
//! Question answering across several documents at once.
//!
//! Each document is a persisted vector index wrapped in a query engine and
//! exposed as a routing tool. A compound question is decomposed into
//! sub-questions routed to individual documents, answered concurrently from
//! retrieved passages, and synthesized into one answer that names its
//! sources. A bounded ReAct agent sits in front of the planner.
//!
//! ## Example
//!
//! ```no_run
//! use multidoc_rs::{AgentConfig, Pipeline, RegistryConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AgentConfig::from_env()?;
//! let documents = RegistryConfig::reference()?;
//! let pipeline = Pipeline::from_config(&config, &documents)?;
//! let run = pipeline.process("Can an insurer offer rebates on premiums?").await?;
//! println!("{}", run.final_answer);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod embedding;
pub mod error;
pub mod index;

#[cfg(test)]
mod test_support;

pub use agent::{
    AgentConfig, AgentRun, AgentStep, LlmProvider, Pipeline, PlannerAnswer, PromptSet,
    ReasoningAgent, RunFailure, SubQuestionPlanner, ToolRegistry,
};
pub use crate::core::{DocumentSpec, Passage, RegistryConfig, ScoredPassage};
pub use embedding::Embedder;
pub use error::{AgentError, Error, IndexError, Result, TemplateError};
pub use index::{DocumentIndex, VectorIndex};
