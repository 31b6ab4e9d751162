//! Read-only document indexes.
//!
//! A [`DocumentIndex`] is loaded once at startup from a persisted store (see
//! [`store`]; binary FAISS stores need the `faiss` feature) and answers
//! nearest-neighbour queries by cosine similarity.
//! Engines depend on the [`VectorIndex`] trait so tests can substitute
//! in-memory or failing indexes.

#[cfg(feature = "faiss")]
mod faiss_store;
pub mod store;

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::core::{Passage, ScoredPassage};
use crate::error::IndexError;

/// Similarity search over a fixed set of passages.
pub trait VectorIndex: Send + Sync {
    /// Returns at most `k` passages ordered by descending score.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the query cannot be compared against the
    /// stored vectors.
    fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ScoredPassage>, IndexError>;

    /// Number of indexed passages.
    fn len(&self) -> usize;

    /// Returns `true` if the index holds no passages.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension of the stored vectors.
    fn dimension(&self) -> usize;
}

/// A persisted vector index for one document.
///
/// Vectors are normalised at load time, so a search is one dot product per
/// passage. Ties are broken by passage id, which makes results independent
/// of load order and thread scheduling.
#[derive(Debug, Clone)]
pub struct DocumentIndex {
    path: Option<PathBuf>,
    passages: Vec<Passage>,
    unit_vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl DocumentIndex {
    /// Loads an index from a persisted store directory.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Missing`] if the directory or an artifact is
    /// absent, and [`IndexError::Malformed`] if an artifact cannot be
    /// decoded, vectors disagree on dimension, or the index is empty.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let contents = store::read_store(path)?;
        let mut index = Self::from_parts(contents.passages, contents.vectors).map_err(|e| {
            match e {
                IndexError::Malformed { message, .. } => IndexError::Malformed {
                    path: path.join(store::VECTOR_STORE_FILE),
                    message,
                },
                other => other,
            }
        })?;
        index.path = Some(path.to_path_buf());
        Ok(index)
    }

    /// Builds an in-memory index from passages and their vectors.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Malformed`] if the inputs are empty, have
    /// different lengths, mixed dimensions, or non-finite components.
    pub fn from_parts(passages: Vec<Passage>, vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let malformed = |message: String| IndexError::Malformed {
            path: PathBuf::from("<memory>"),
            message,
        };

        if passages.is_empty() {
            return Err(malformed("index contains no passages".to_string()));
        }
        if passages.len() != vectors.len() {
            return Err(malformed(format!(
                "{} passages but {} vectors",
                passages.len(),
                vectors.len()
            )));
        }

        let dimension = vectors.first().map_or(0, Vec::len);
        if dimension == 0 {
            return Err(malformed("vectors have zero dimension".to_string()));
        }

        let mut unit_vectors = Vec::with_capacity(vectors.len());
        for (passage, vector) in passages.iter().zip(vectors) {
            if vector.len() != dimension {
                return Err(malformed(format!(
                    "passage '{}' has dimension {}, expected {dimension}",
                    passage.id,
                    vector.len()
                )));
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(malformed(format!(
                    "passage '{}' has a non-finite vector component",
                    passage.id
                )));
            }
            unit_vectors.push(normalize(vector));
        }

        Ok(Self {
            path: None,
            passages,
            unit_vectors,
            dimension,
        })
    }

    /// Directory the index was loaded from, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl VectorIndex for DocumentIndex {
    fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ScoredPassage>, IndexError> {
        if query_embedding.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query_embedding.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = normalize(query_embedding.to_vec());

        let mut scored: Vec<(usize, f32)> = self
            .unit_vectors
            .par_iter()
            .enumerate()
            .map(|(idx, v)| {
                let score = dot(&query, v);
                (idx, if score.is_nan() { f32::MIN } else { score })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| self.passages[a.0].id.cmp(&self.passages[b.0].id))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(idx, score)| ScoredPassage {
                passage: self.passages[idx].clone(),
                score,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.passages.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = dot(&v, &v).sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
