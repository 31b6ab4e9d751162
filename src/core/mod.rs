//! Core data types: document declarations and retrieved passages.

pub mod document;
pub mod passage;

pub use document::{DocumentSpec, RegistryConfig};
pub use passage::{Passage, ScoredPassage};
