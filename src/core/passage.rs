//! Retrieved passage types shared by the index and the engines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A passage stored in a document index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Node id from the persisted store.
    pub id: String,
    /// Passage text.
    pub text: String,
    /// Arbitrary metadata recorded at indexing time (page, section, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A passage returned by similarity search, with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    /// The retrieved passage.
    #[serde(flatten)]
    pub passage: Passage,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

impl ScoredPassage {
    /// Passage text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.passage.text
    }

    /// Passage id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.passage.id
    }
}
