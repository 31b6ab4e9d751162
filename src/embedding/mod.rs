//! Query embedding.
//!
//! Index construction is done elsewhere; at query time only the question is
//! embedded, with the same model the index was built with.

pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

pub use openai::OpenAiEmbedder;

use crate::agent::config::AgentConfig;
use crate::error::AgentError;

/// Text embedding service.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Embeds a single text.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EmbeddingService`] on API failures or timeouts.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError>;
}

/// Creates an [`Embedder`] for the configured provider.
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
pub fn create_embedder(config: &AgentConfig) -> Result<Arc<dyn Embedder>, AgentError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config))),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}
