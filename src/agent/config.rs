//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default completion model.
const DEFAULT_MODEL: &str = "gpt-3.5-turbo-0125";
/// Default embedding model; must match the model the indexes were built with.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
/// Default passages retrieved per document query.
const DEFAULT_TOP_K: usize = 3;
/// Default reasoning-agent step bound.
const DEFAULT_MAX_STEPS: usize = 8;
/// Default maximum concurrent sub-question dispatches.
const DEFAULT_MAX_CONCURRENCY: usize = 16;
/// Default max tokens for per-document answers.
const DEFAULT_ANSWER_MAX_TOKENS: u32 = 1024;
/// Default max tokens for the aggregate synthesis.
const DEFAULT_SYNTHESIZER_MAX_TOKENS: u32 = 2048;
/// Default max tokens for decomposition output.
const DEFAULT_DECOMPOSER_MAX_TOKENS: u32 = 1024;
/// Default max tokens per reasoning step.
const DEFAULT_AGENT_MAX_TOKENS: u32 = 1024;
/// Default per-call timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Default retries for transient completion failures.
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Configuration for the retrieval and agent pipeline.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Completion model used by every agent.
    pub model: String,
    /// Embedding model used for queries.
    pub embedding_model: String,
    /// Passages retrieved per document query.
    pub top_k: usize,
    /// Maximum reasoning steps before the run is abandoned.
    pub max_steps: usize,
    /// Maximum concurrent sub-question dispatches.
    pub max_concurrency: usize,
    /// Maximum tokens for per-document answers.
    pub answer_max_tokens: u32,
    /// Maximum tokens for the aggregate synthesis.
    pub synthesizer_max_tokens: u32,
    /// Maximum tokens for decomposition output.
    pub decomposer_max_tokens: u32,
    /// Maximum tokens per reasoning step.
    pub agent_max_tokens: u32,
    /// Timeout applied to every completion and embedding call.
    pub timeout: Duration,
    /// Retry attempts for failed completion calls.
    pub max_retries: u32,
    /// Directory containing prompt template files.
    ///
    /// When set, prompts are loaded from markdown files in this directory,
    /// falling back to compiled-in defaults for any missing or invalid file.
    pub prompt_dir: Option<PathBuf>,
    /// Number retrieved passages and ask per-document answers to cite them.
    pub citations: bool,
    /// Return the first tool observation as the final answer.
    pub return_direct: bool,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    embedding_model: Option<String>,
    top_k: Option<usize>,
    max_steps: Option<usize>,
    max_concurrency: Option<usize>,
    answer_max_tokens: Option<u32>,
    synthesizer_max_tokens: Option<u32>,
    decomposer_max_tokens: Option<u32>,
    agent_max_tokens: Option<u32>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    prompt_dir: Option<PathBuf>,
    citations: Option<bool>,
    return_direct: Option<bool>,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("MULTIDOC_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("MULTIDOC_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("MULTIDOC_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("MULTIDOC_MODEL").ok();
        }
        if self.embedding_model.is_none() {
            self.embedding_model = std::env::var("MULTIDOC_EMBEDDING_MODEL").ok();
        }
        if self.top_k.is_none() {
            self.top_k = env_parse("MULTIDOC_TOP_K");
        }
        if self.max_steps.is_none() {
            self.max_steps = env_parse("MULTIDOC_MAX_STEPS");
        }
        if self.max_concurrency.is_none() {
            self.max_concurrency = env_parse("MULTIDOC_MAX_CONCURRENCY");
        }
        if self.timeout.is_none() {
            self.timeout = env_parse("MULTIDOC_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("MULTIDOC_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        if self.citations.is_none() {
            self.citations = env_parse("MULTIDOC_CITATIONS");
        }
        if self.return_direct.is_none() {
            self.return_direct = env_parse("MULTIDOC_RETURN_DIRECT");
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the completion model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Sets passages retrieved per document query.
    #[must_use]
    pub const fn top_k(mut self, n: usize) -> Self {
        self.top_k = Some(n);
        self
    }

    /// Sets the reasoning-agent step bound.
    #[must_use]
    pub const fn max_steps(mut self, n: usize) -> Self {
        self.max_steps = Some(n);
        self
    }

    /// Sets the maximum concurrency.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Sets the per-document answer max tokens.
    #[must_use]
    pub const fn answer_max_tokens(mut self, n: u32) -> Self {
        self.answer_max_tokens = Some(n);
        self
    }

    /// Sets the synthesizer max tokens.
    #[must_use]
    pub const fn synthesizer_max_tokens(mut self, n: u32) -> Self {
        self.synthesizer_max_tokens = Some(n);
        self
    }

    /// Sets the decomposer max tokens.
    #[must_use]
    pub const fn decomposer_max_tokens(mut self, n: u32) -> Self {
        self.decomposer_max_tokens = Some(n);
        self
    }

    /// Sets the max tokens per reasoning step.
    #[must_use]
    pub const fn agent_max_tokens(mut self, n: u32) -> Self {
        self.agent_max_tokens = Some(n);
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the max retries.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Enables or disables numbered citations in per-document answers.
    #[must_use]
    pub const fn citations(mut self, enabled: bool) -> Self {
        self.citations = Some(enabled);
        self
    }

    /// Enables or disables returning the first tool observation directly.
    #[must_use]
    pub const fn return_direct(mut self, enabled: bool) -> Self {
        self.return_direct = Some(enabled);
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set, or
    /// [`AgentError::Configuration`] if a bound is zero.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        let top_k = self.top_k.unwrap_or(DEFAULT_TOP_K);
        let max_steps = self.max_steps.unwrap_or(DEFAULT_MAX_STEPS);
        let max_concurrency = self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY);

        for (name, value) in [
            ("top_k", top_k),
            ("max_steps", max_steps),
            ("max_concurrency", max_concurrency),
        ] {
            if value == 0 {
                return Err(AgentError::Configuration {
                    message: format!("{name} must be at least 1"),
                });
            }
        }

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            embedding_model: self
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            top_k,
            max_steps,
            max_concurrency,
            answer_max_tokens: self.answer_max_tokens.unwrap_or(DEFAULT_ANSWER_MAX_TOKENS),
            synthesizer_max_tokens: self
                .synthesizer_max_tokens
                .unwrap_or(DEFAULT_SYNTHESIZER_MAX_TOKENS),
            decomposer_max_tokens: self
                .decomposer_max_tokens
                .unwrap_or(DEFAULT_DECOMPOSER_MAX_TOKENS),
            agent_max_tokens: self.agent_max_tokens.unwrap_or(DEFAULT_AGENT_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            prompt_dir: self.prompt_dir,
            citations: self.citations.unwrap_or(false),
            return_direct: self.return_direct.unwrap_or(false),
        })
    }
}
