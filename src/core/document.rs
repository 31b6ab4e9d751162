//! Document registry configuration.
//!
//! Documents are declared as data: a list of [`DocumentSpec`] entries read
//! from TOML. The five reference statutes ship in `config/documents.toml`
//! and are compiled in as [`RegistryConfig::reference`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Compiled-in reference registry.
const REFERENCE_DOCUMENTS: &str = include_str!("../../config/documents.toml");

/// Base directory the reference registry's relative paths resolve against.
const REFERENCE_BASE_DIR: &str = "config";

/// Declaration of one document and its persisted index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSpec {
    /// Short routing name, used as the tool name (unique per registry).
    pub id: String,
    /// Human-readable title.
    pub name: String,
    /// Free-text description shown to the decomposition model for routing.
    pub description: String,
    /// Directory containing the persisted index artifacts.
    pub index_path: PathBuf,
}

/// Immutable list of documents to load at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Documents in registration order.
    #[serde(default)]
    pub documents: Vec<DocumentSpec>,
}

impl RegistryConfig {
    /// Parses a registry from TOML text.
    ///
    /// Relative `index_path` values are resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the TOML is invalid, a
    /// document has an empty id, or two documents share an id.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self, AgentError> {
        let mut config: Self = toml::from_str(text).map_err(|e| AgentError::Configuration {
            message: format!("invalid document registry: {e}"),
        })?;

        for doc in &mut config.documents {
            if doc.index_path.is_relative() {
                doc.index_path = base_dir.join(&doc.index_path);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads a registry from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the file cannot be read or
    /// fails validation.
    pub fn from_file(path: &Path) -> Result<Self, AgentError> {
        let text = std::fs::read_to_string(path).map_err(|e| AgentError::Configuration {
            message: format!("cannot read document registry {}: {e}", path.display()),
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&text, base_dir)
    }

    /// The five reference statutes, with index paths under `./MultiDocQA/`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] only if the compiled-in data is
    /// corrupt.
    pub fn reference() -> Result<Self, AgentError> {
        Self::from_toml_str(REFERENCE_DOCUMENTS, Path::new(REFERENCE_BASE_DIR))
    }

    /// Number of declared documents.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if no documents are declared.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn validate(&self) -> Result<(), AgentError> {
        let mut seen = HashSet::new();
        for doc in &self.documents {
            if doc.id.trim().is_empty() {
                return Err(AgentError::Configuration {
                    message: format!("document '{}' has an empty id", doc.name),
                });
            }
            if !seen.insert(doc.id.as_str()) {
                return Err(AgentError::Configuration {
                    message: format!("document id '{}' is declared twice", doc.id),
                });
            }
        }
        Ok(())
    }
}
