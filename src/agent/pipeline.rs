//! Startup wiring and the query entry point.
//!
//! Loads every declared index in order, builds one query engine and tool
//! per document, and puts the planner behind the reasoning agent.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::answer::PlannerAnswer;
use super::client::create_provider;
use super::config::AgentConfig;
use super::planner::{PlannerTool, SubQuestionPlanner};
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::query_engine::QueryEngine;
use super::react::{AgentRun, ReasoningAgent, RunFailure};
use super::registry::{QueryEngineTool, ToolRegistry};
use super::tool::Tool;
use crate::core::{DocumentSpec, RegistryConfig};
use crate::embedding::{Embedder, create_embedder};
use crate::error::AgentError;
use crate::index::{DocumentIndex, VectorIndex};

/// A document excluded at startup because its index failed to load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadFailure {
    /// Document id.
    pub document: String,
    /// Rendered load error.
    pub error: String,
}

/// A document whose index loaded.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// The declaration it was loaded from.
    pub spec: DocumentSpec,
    /// The loaded index.
    pub index: Arc<DocumentIndex>,
}

/// Loads every declared index, in order.
///
/// A document whose index is missing or malformed is logged and reported
/// in the second vector; loading continues with the next document.
#[must_use]
pub fn load_indexes(registry_config: &RegistryConfig) -> (Vec<LoadedDocument>, Vec<LoadFailure>) {
    let mut loaded = Vec::with_capacity(registry_config.len());
    let mut failures = Vec::new();

    for spec in &registry_config.documents {
        match DocumentIndex::load(&spec.index_path) {
            Ok(index) => {
                info!(
                    document = %spec.id,
                    passages = index.len(),
                    dimension = index.dimension(),
                    "loaded index"
                );
                loaded.push(LoadedDocument {
                    spec: spec.clone(),
                    index: Arc::new(index),
                });
            }
            Err(e) => {
                let error = AgentError::IndexLoad {
                    document: spec.id.clone(),
                    message: e.to_string(),
                };
                warn!(document = %spec.id, error = %e, "excluding document");
                failures.push(LoadFailure {
                    document: spec.id.clone(),
                    error: error.to_string(),
                });
            }
        }
    }

    (loaded, failures)
}

/// The assembled question-answering system.
pub struct Pipeline {
    registry: Arc<ToolRegistry>,
    planner: Arc<SubQuestionPlanner>,
    agent: ReasoningAgent,
    load_failures: Vec<LoadFailure>,
}

impl Pipeline {
    /// Builds the pipeline from configuration, creating the provider,
    /// embedder and prompt set it describes.
    ///
    /// # Errors
    ///
    /// Returns configuration errors from provider or embedder creation,
    /// [`AgentError::Template`] for invalid prompts, and
    /// [`AgentError::NoDocuments`] if no index loads.
    pub fn from_config(config: &AgentConfig, registry_config: &RegistryConfig) -> Result<Self, AgentError> {
        let provider = create_provider(config)?;
        let embedder = create_embedder(config)?;
        let prompts = PromptSet::load(config.prompt_dir.as_deref())?;
        Self::new(config, registry_config, provider, embedder, &prompts)
    }

    /// Loads every declared index and assembles the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NoDocuments`] if no index loads,
    /// [`AgentError::DuplicateName`] if two documents share an id, and
    /// [`AgentError::Template`] for invalid prompts.
    pub fn new(
        config: &AgentConfig,
        registry_config: &RegistryConfig,
        provider: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        prompts: &PromptSet,
    ) -> Result<Self, AgentError> {
        let (loaded, load_failures) = load_indexes(registry_config);
        let documents = loaded
            .into_iter()
            .map(|doc| (doc.spec, doc.index as Arc<dyn VectorIndex>))
            .collect();
        let mut pipeline = Self::from_indexes(config, documents, provider, embedder, prompts)?;
        pipeline.load_failures = load_failures;
        Ok(pipeline)
    }

    /// Assembles the pipeline over already loaded indexes.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NoDocuments`] if `documents` is empty,
    /// [`AgentError::DuplicateName`] if two documents share an id, and
    /// [`AgentError::Template`] for invalid prompts.
    pub fn from_indexes(
        config: &AgentConfig,
        documents: Vec<(DocumentSpec, Arc<dyn VectorIndex>)>,
        provider: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        prompts: &PromptSet,
    ) -> Result<Self, AgentError> {
        if documents.is_empty() {
            return Err(AgentError::NoDocuments);
        }

        let mut registry = ToolRegistry::new();
        for (spec, index) in documents {
            let engine = QueryEngine::new(
                &spec,
                index,
                Arc::clone(&embedder),
                Arc::clone(&provider),
                config,
                prompts,
            )?;
            registry.register(QueryEngineTool::from_spec(&spec, Arc::new(engine), config.top_k))?;
        }
        let registry = Arc::new(registry);

        let planner = Arc::new(SubQuestionPlanner::new(
            Arc::clone(&provider),
            Arc::clone(&registry),
            config.clone(),
            prompts,
        )?);
        let tool: Arc<dyn Tool> = Arc::new(PlannerTool::new(Arc::clone(&planner)));
        let agent = ReasoningAgent::new(provider, vec![tool], config, prompts)?;

        info!(documents = registry.len(), "pipeline ready");
        Ok(Self {
            registry,
            planner,
            agent,
            load_failures: Vec::new(),
        })
    }

    /// Registered document tools.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Documents excluded at startup.
    #[must_use]
    pub fn load_failures(&self) -> &[LoadFailure] {
        &self.load_failures
    }

    /// Answers a query through the reasoning agent.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] describing why the run stopped, with the
    /// steps taken before it.
    pub async fn process(&self, query: &str) -> Result<AgentRun, RunFailure> {
        self.agent.run(query).await
    }

    /// Answers a query with the planner alone, keeping per-source detail.
    ///
    /// # Errors
    ///
    /// See [`SubQuestionPlanner::query`].
    pub async fn plan(&self, query: &str) -> Result<PlannerAnswer, AgentError> {
        self.planner.query(query).await
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("registry", &self.registry)
            .field("agent", &self.agent)
            .field("load_failures", &self.load_failures)
            .finish_non_exhaustive()
    }
}
