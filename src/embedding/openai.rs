//! `OpenAI` embeddings via `async-openai`.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::CreateEmbeddingRequestArgs;
use async_trait::async_trait;
use tracing::debug;

use super::Embedder;
use crate::agent::config::AgentConfig;
use crate::error::AgentError;

/// `OpenAI`-compatible embedding client.
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiEmbedder {
    /// Creates a new embedder from agent configuration.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            client: Client::with_config(openai_config),
            model: config.embedding_model.clone(),
            timeout: config.timeout,
        }
    }
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("client", &"<async-openai::Client>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError> {
        if text.trim().is_empty() {
            return Err(AgentError::EmbeddingService {
                message: "cannot embed empty text".to_string(),
            });
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.as_str())
            .input(text)
            .build()
            .map_err(|e| AgentError::EmbeddingService {
                message: format!("invalid embedding request: {e}"),
            })?;

        let response = tokio::time::timeout(self.timeout, self.client.embeddings().create(request))
            .await
            .map_err(|_| AgentError::EmbeddingService {
                message: format!("timed out after {}s", self.timeout.as_secs_f64()),
            })?
            .map_err(|e| AgentError::EmbeddingService {
                message: e.to_string(),
            })?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or_else(|| AgentError::EmbeddingService {
                message: "response contained no embeddings".to_string(),
            })?;

        debug!(model = %self.model, dimension = embedding.len(), "embedded query");
        Ok(embedding)
    }
}
