//! Scripted providers, embedders and index fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::agent::config::AgentConfig;
use crate::agent::answer::QueryAnswer;
use crate::agent::message::{ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::prompt::{ANSWER_SYSTEM_PROMPT, DECOMPOSER_SYSTEM_PROMPT, REACT_SYSTEM_PROMPT};
use crate::agent::provider::LlmProvider;
use crate::agent::query_engine::AnswerEngine;
use crate::core::Passage;
use crate::embedding::Embedder;
use crate::error::AgentError;
use crate::index::DocumentIndex;

/// Tokens reported for every scripted completion.
pub const TOKENS_PER_CALL: u32 = 15;

type Handler = dyn Fn(&ChatRequest) -> Result<String, AgentError> + Send + Sync;

/// Which agent sent a request, judged by its system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Decomposer,
    Responder,
    Synthesizer,
    Reasoner,
}

fn prefix(text: &str) -> &str {
    &text[..24]
}

/// Classifies a request by the agent that built it.
pub fn caller(request: &ChatRequest) -> Caller {
    let system = request
        .messages
        .iter()
        .find(|m| m.role == Role::System)
        .map_or("", |m| m.content.as_str());
    if system.starts_with(prefix(DECOMPOSER_SYSTEM_PROMPT)) {
        Caller::Decomposer
    } else if system.starts_with(prefix(ANSWER_SYSTEM_PROMPT)) {
        Caller::Responder
    } else if system.starts_with(prefix(REACT_SYSTEM_PROMPT)) {
        Caller::Reasoner
    } else {
        Caller::Synthesizer
    }
}

/// Content of the last user message.
pub fn last_user(request: &ChatRequest) -> &str {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map_or("", |m| m.content.as_str())
}

/// Provider whose replies come from a closure.
pub struct FnProvider {
    handler: Box<Handler>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FnProvider {
    pub fn new(
        handler: impl Fn(&ChatRequest) -> Result<String, AgentError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replies with `responses` in order, then fails.
    pub fn scripted(responses: &[&str]) -> Self {
        let responses: Vec<String> = responses.iter().map(ToString::to_string).collect();
        let next = AtomicUsize::new(0);
        Self::new(move |_| {
            let i = next.fetch_add(1, Ordering::SeqCst);
            responses
                .get(i)
                .cloned()
                .ok_or_else(|| AgentError::CompletionService {
                    message: "script exhausted".to_string(),
                    status: None,
                })
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LlmProvider for FnProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let content = (self.handler)(request)?;
        Ok(ChatResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: TOKENS_PER_CALL,
            },
            finish_reason: Some("stop".to_string()),
        })
    }
}

/// Starts a TCP server that accepts connections and never answers;
/// returns an API base URL pointing at it.
pub async fn silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|_| unreachable!());
    let addr = listener.local_addr().unwrap_or_else(|_| unreachable!());
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });
    format!("http://{addr}/v1")
}

/// Configuration aimed at `base_url` with a short timeout and no retries.
pub fn unresponsive_config(base_url: &str) -> AgentConfig {
    AgentConfig::builder()
        .api_key("test")
        .base_url(base_url)
        .timeout(Duration::from_millis(100))
        .max_retries(0)
        .build()
        .unwrap_or_else(|_| unreachable!())
}

/// Embedder returning the same vector for every text.
pub struct FixedEmbedder(pub Vec<f32>);

#[async_trait]
impl Embedder for FixedEmbedder {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, AgentError> {
        Ok(self.0.clone())
    }
}

/// Embedder that always fails.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, AgentError> {
        Err(AgentError::EmbeddingService {
            message: "service unavailable".to_string(),
        })
    }
}

/// Builds an in-memory index from `(id, text, vector)` entries.
pub fn index(entries: &[(&str, &str, Vec<f32>)]) -> Arc<DocumentIndex> {
    let passages = entries
        .iter()
        .map(|(id, text, _)| Passage {
            id: (*id).to_string(),
            text: (*text).to_string(),
            metadata: Default::default(),
        })
        .collect();
    let vectors = entries.iter().map(|(_, _, v)| v.clone()).collect();
    Arc::new(DocumentIndex::from_parts(passages, vectors).unwrap_or_else(|_| unreachable!()))
}

/// Configuration with no retries and small bounds.
pub fn config() -> AgentConfig {
    AgentConfig::builder()
        .api_key("test")
        .max_retries(0)
        .build()
        .unwrap_or_else(|_| unreachable!())
}

/// Engine that answers with a fixed text after an optional delay.
pub struct StaticEngine(pub String);

#[async_trait]
impl AnswerEngine for StaticEngine {
    async fn answer(&self, query: &str, _top_k: usize) -> Result<QueryAnswer, AgentError> {
        Ok(QueryAnswer {
            document: self.0.clone(),
            text: if self.0.is_empty() {
                String::new()
            } else {
                format!("{} says: {query}", self.0)
            },
            citations: Vec::new(),
            total_tokens: 1,
        })
    }
}

/// Engine that sleeps before answering.
pub struct DelayedEngine {
    pub name: String,
    pub delay: Duration,
}

#[async_trait]
impl AnswerEngine for DelayedEngine {
    async fn answer(&self, query: &str, _top_k: usize) -> Result<QueryAnswer, AgentError> {
        tokio::time::sleep(self.delay).await;
        Ok(QueryAnswer {
            document: self.name.clone(),
            text: format!("{} says: {query}", self.name),
            citations: Vec::new(),
            total_tokens: 1,
        })
    }
}

/// Engine whose retrieval always fails.
pub struct FailingEngine(pub String);

#[async_trait]
impl AnswerEngine for FailingEngine {
    async fn answer(&self, _query: &str, _top_k: usize) -> Result<QueryAnswer, AgentError> {
        Err(AgentError::Retrieval {
            document: self.0.clone(),
            message: "index unavailable".to_string(),
        })
    }
}
