//! Persisted index artifacts.
//!
//! An index directory holds the artifacts written by the common Python RAG
//! toolkits' vector stores. The simple store keeps vectors in JSON:
//!
//! ```text
//! <index_path>/
//!   default__vector_store.json   {"embedding_dict": {node_id: [f32, ...]}, ...}
//!   docstore.json                {"docstore/data": {node_id: {"__data__": {"text": ..}}}}
//! ```
//!
//! The FAISS store writes a binary index under the same vector filename and
//! maps index positions to node ids in `index_store.json`:
//!
//! ```text
//!   default__vector_store.json   binary FAISS index (flat)
//!   index_store.json             {"index_store/data": {id: {"__data__": {"nodes_dict": {"0": node_id}}}}}
//! ```
//!
//! The format is chosen from the first byte of the vector file. Reading the
//! binary index needs the `faiss` feature. Only the fields needed for
//! retrieval are read; everything else is ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::core::Passage;
use crate::error::IndexError;

/// Vector index artifact filename.
pub const VECTOR_STORE_FILE: &str = "default__vector_store.json";
/// Storage-context (node text) artifact filename.
pub const DOCSTORE_FILE: &str = "docstore.json";
/// Position-to-node mapping written alongside a FAISS index.
pub const INDEX_STORE_FILE: &str = "index_store.json";

#[derive(Debug, Deserialize)]
struct VectorStoreArtifact {
    embedding_dict: BTreeMap<String, Vec<f32>>,
    #[serde(default)]
    metadata_dict: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DocstoreArtifact {
    #[serde(rename = "docstore/data", default)]
    data: BTreeMap<String, DocstoreEntry>,
}

#[derive(Debug, Deserialize)]
struct DocstoreEntry {
    #[serde(rename = "__data__")]
    data: NodeData,
}

#[derive(Debug, Deserialize)]
struct NodeData {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct IndexStoreArtifact {
    #[serde(rename = "index_store/data", default)]
    data: BTreeMap<String, IndexStoreEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexStoreEntry {
    #[serde(rename = "__type__", default)]
    kind: Option<String>,
    /// Either an embedded JSON string or an object.
    #[serde(rename = "__data__")]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct IndexStruct {
    #[serde(default)]
    nodes_dict: BTreeMap<String, String>,
}

/// Passages and their vectors, ordered by node id.
#[derive(Debug)]
pub struct StoreContents {
    /// Passages in node-id order.
    pub passages: Vec<Passage>,
    /// One vector per passage, same order.
    pub vectors: Vec<Vec<f32>>,
}

/// Reads and cross-checks the artifacts of an index directory.
pub fn read_store(dir: &Path) -> Result<StoreContents, IndexError> {
    if !dir.is_dir() {
        return Err(IndexError::Missing {
            path: dir.to_path_buf(),
        });
    }

    let vector_path = dir.join(VECTOR_STORE_FILE);
    let bytes = read_bytes(&vector_path)?;
    let (embeddings, extra_metadata) = if is_json(&bytes) {
        let artifact: VectorStoreArtifact = parse_json(&vector_path, &bytes)?;
        (artifact.embedding_dict, artifact.metadata_dict)
    } else {
        let vectors = read_faiss_vectors(&vector_path)?;
        let positions = read_positions(&dir.join(INDEX_STORE_FILE))?;
        (key_by_node_id(&vector_path, positions, vectors)?, BTreeMap::new())
    };
    let docstore: DocstoreArtifact = read_json(&dir.join(DOCSTORE_FILE))?;

    let mut passages = Vec::with_capacity(embeddings.len());
    let mut vectors = Vec::with_capacity(embeddings.len());

    for (node_id, vector) in embeddings {
        let node = docstore
            .data
            .get(&node_id)
            .ok_or_else(|| IndexError::Malformed {
                path: dir.join(DOCSTORE_FILE),
                message: format!("node '{node_id}' has an embedding but no stored text"),
            })?;
        let text = node.data.text.clone().ok_or_else(|| IndexError::Malformed {
            path: dir.join(DOCSTORE_FILE),
            message: format!("node '{node_id}' has no text"),
        })?;

        let mut metadata = node.data.metadata.clone();
        if let Some(serde_json::Value::Object(extra)) = extra_metadata.get(&node_id) {
            for (k, v) in extra {
                metadata.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

        passages.push(Passage {
            id: node_id,
            text,
            metadata,
        });
        vectors.push(vector);
    }

    Ok(StoreContents { passages, vectors })
}

fn is_json(bytes: &[u8]) -> bool {
    bytes.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{')
}

#[cfg(feature = "faiss")]
fn read_faiss_vectors(path: &Path) -> Result<Vec<Vec<f32>>, IndexError> {
    super::faiss_store::read_vectors(path)
}

#[cfg(not(feature = "faiss"))]
fn read_faiss_vectors(path: &Path) -> Result<Vec<Vec<f32>>, IndexError> {
    Err(IndexError::Malformed {
        path: path.to_path_buf(),
        message: "binary FAISS index; rebuild multidoc with `--features faiss` to load it"
            .to_string(),
    })
}

/// Reads the position-to-node-id map of the single vector index in an
/// index store.
fn read_positions(path: &Path) -> Result<BTreeMap<usize, String>, IndexError> {
    let malformed = |message: String| IndexError::Malformed {
        path: path.to_path_buf(),
        message,
    };

    let artifact: IndexStoreArtifact = read_json(path)?;
    let mut entries: Vec<IndexStoreEntry> = artifact
        .data
        .into_values()
        .filter(|e| e.kind.as_deref().is_none_or(|k| k == "vector_store"))
        .collect();
    let entry = match entries.len() {
        1 => entries.remove(0),
        n => return Err(malformed(format!("expected one vector index, found {n}"))),
    };

    let index: IndexStruct = match entry.data {
        serde_json::Value::String(text) => serde_json::from_str(&text),
        other => serde_json::from_value(other),
    }
    .map_err(|e| malformed(e.to_string()))?;

    index
        .nodes_dict
        .into_iter()
        .map(|(position, node_id)| {
            position
                .parse::<usize>()
                .map(|p| (p, node_id))
                .map_err(|_| malformed(format!("position '{position}' is not an integer")))
        })
        .collect()
}

/// Pairs the i-th vector with the node id stored at position i.
fn key_by_node_id(
    path: &Path,
    mut positions: BTreeMap<usize, String>,
    vectors: Vec<Vec<f32>>,
) -> Result<BTreeMap<String, Vec<f32>>, IndexError> {
    let malformed = |message: String| IndexError::Malformed {
        path: path.to_path_buf(),
        message,
    };

    if positions.len() != vectors.len() {
        return Err(malformed(format!(
            "index holds {} vectors but {INDEX_STORE_FILE} maps {} positions",
            vectors.len(),
            positions.len()
        )));
    }

    let mut keyed = BTreeMap::new();
    for (position, vector) in vectors.into_iter().enumerate() {
        let node_id = positions
            .remove(&position)
            .ok_or_else(|| malformed(format!("position {position} has no node id")))?;
        if keyed.contains_key(&node_id) {
            return Err(malformed(format!("node '{node_id}' is stored twice")));
        }
        keyed.insert(node_id, vector);
    }
    Ok(keyed)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, IndexError> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IndexError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            IndexError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, IndexError> {
    parse_json(path, &read_bytes(path)?)
}

fn parse_json<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, IndexError> {
    serde_json::from_slice(bytes).map_err(|e| IndexError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    /// Leading bytes of a FAISS flat index file.
    const FAISS_HEADER: [u8; 5] = [0x49, 0x78, 0x46, 0x49, 0x00];

    fn write(dir: &Path, name: &str, value: &serde_json::Value) {
        std::fs::write(dir.join(name), value.to_string()).unwrap_or_else(|_| unreachable!());
    }

    #[test]
    fn test_read_store_orders_by_node_id() {
        let tmp = TempDir::new().unwrap_or_else(|_| unreachable!());
        write(
            tmp.path(),
            VECTOR_STORE_FILE,
            &json!({
                "embedding_dict": {"n2": [0.0, 1.0], "n1": [1.0, 0.0]},
                "metadata_dict": {"n1": {"section": "45"}},
                "text_id_to_ref_doc_id": {}
            }),
        );
        write(
            tmp.path(),
            DOCSTORE_FILE,
            &json!({"docstore/data": {
                "n1": {"__data__": {"text": "first", "metadata": {"page": 1}}, "__type__": "1"},
                "n2": {"__data__": {"text": "second"}, "__type__": "1"}
            }}),
        );

        let store = read_store(tmp.path()).unwrap_or_else(|_| unreachable!());
        assert_eq!(store.passages.len(), 2);
        assert_eq!(store.passages[0].id, "n1");
        assert_eq!(store.passages[0].text, "first");
        assert_eq!(store.passages[0].metadata["page"], 1);
        assert_eq!(store.passages[0].metadata["section"], "45");
        assert_eq!(store.vectors[1], vec![0.0, 1.0]);
    }

    #[test]
    fn test_missing_directory() {
        let result = read_store(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(IndexError::Missing { .. })));
    }

    #[test]
    fn test_missing_docstore() {
        let tmp = TempDir::new().unwrap_or_else(|_| unreachable!());
        write(tmp.path(), VECTOR_STORE_FILE, &json!({"embedding_dict": {}}));
        let result = read_store(tmp.path());
        assert!(matches!(result, Err(IndexError::Missing { .. })));
    }

    #[test]
    fn test_json_detection_skips_whitespace() {
        assert!(is_json(b"  \n{\"embedding_dict\": {}}"));
        assert!(!is_json(&FAISS_HEADER));
        assert!(!is_json(b""));
    }

    #[cfg(not(feature = "faiss"))]
    #[test]
    fn test_binary_vector_store_names_the_feature() {
        let tmp = TempDir::new().unwrap_or_else(|_| unreachable!());
        std::fs::write(tmp.path().join(VECTOR_STORE_FILE), FAISS_HEADER)
            .unwrap_or_else(|_| unreachable!());
        write(tmp.path(), DOCSTORE_FILE, &json!({"docstore/data": {}}));

        let result = read_store(tmp.path());
        assert!(
            matches!(result, Err(IndexError::Malformed { ref message, .. }) if message.contains("--features faiss"))
        );
    }

    #[test]
    fn test_positions_from_string_encoded_index_struct() {
        let tmp = TempDir::new().unwrap_or_else(|_| unreachable!());
        let index_struct = json!({
            "index_id": "a1",
            "summary": null,
            "nodes_dict": {"0": "node-b", "1": "node-a", "10": "node-c"},
            "doc_id_dict": {},
            "embeddings_dict": {}
        });
        write(
            tmp.path(),
            INDEX_STORE_FILE,
            &json!({"index_store/data": {"a1": {
                "__type__": "vector_store",
                "__data__": index_struct.to_string()
            }}}),
        );

        let positions =
            read_positions(&tmp.path().join(INDEX_STORE_FILE)).unwrap_or_else(|_| unreachable!());
        let keys: Vec<usize> = positions.keys().copied().collect();
        assert_eq!(keys, vec![0, 1, 10]);
        assert_eq!(positions[&0], "node-b");
    }

    #[test]
    fn test_positions_from_object_index_struct() {
        let tmp = TempDir::new().unwrap_or_else(|_| unreachable!());
        write(
            tmp.path(),
            INDEX_STORE_FILE,
            &json!({"index_store/data": {"a1": {
                "__type__": "vector_store",
                "__data__": {"nodes_dict": {"0": "only"}}
            }}}),
        );

        let positions =
            read_positions(&tmp.path().join(INDEX_STORE_FILE)).unwrap_or_else(|_| unreachable!());
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[&0], "only");
    }

    #[test]
    fn test_positions_require_one_vector_index() {
        let tmp = TempDir::new().unwrap_or_else(|_| unreachable!());
        write(
            tmp.path(),
            INDEX_STORE_FILE,
            &json!({"index_store/data": {"k": {"__type__": "keyword_table", "__data__": {}}}}),
        );

        let result = read_positions(&tmp.path().join(INDEX_STORE_FILE));
        assert!(
            matches!(result, Err(IndexError::Malformed { ref message, .. }) if message.contains("found 0"))
        );
    }

    #[test]
    fn test_vectors_keyed_by_position() {
        let positions = BTreeMap::from([(0, "z".to_string()), (1, "a".to_string())]);
        let keyed = key_by_node_id(Path::new("v"), positions, vec![vec![1.0], vec![2.0]])
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(keyed["z"], vec![1.0]);
        assert_eq!(keyed["a"], vec![2.0]);
        assert_eq!(keyed.keys().next().map(String::as_str), Some("a"));
    }

    #[test]
    fn test_vector_count_must_match_positions() {
        let positions = BTreeMap::from([(0, "a".to_string())]);
        let result = key_by_node_id(Path::new("v"), positions, vec![vec![1.0], vec![2.0]]);
        assert!(matches!(result, Err(IndexError::Malformed { .. })));

        let gapped = BTreeMap::from([(0, "a".to_string()), (2, "b".to_string())]);
        let result = key_by_node_id(Path::new("v"), gapped, vec![vec![1.0], vec![2.0]]);
        assert!(
            matches!(result, Err(IndexError::Malformed { ref message, .. }) if message.contains("position 1"))
        );
    }

    #[cfg(feature = "faiss")]
    #[test]
    fn test_read_faiss_store() {
        use faiss::Index;
        use faiss::index::flat::FlatIndexImpl;

        let tmp = TempDir::new().unwrap_or_else(|_| unreachable!());
        let mut index = FlatIndexImpl::new_l2(2).unwrap_or_else(|_| unreachable!());
        index
            .add(&[0.0, 1.0, 1.0, 0.0])
            .unwrap_or_else(|_| unreachable!());
        let vector_path = tmp.path().join(VECTOR_STORE_FILE);
        faiss::write_index(&index, &*vector_path.to_string_lossy())
            .unwrap_or_else(|_| unreachable!());
        write(
            tmp.path(),
            INDEX_STORE_FILE,
            &json!({"index_store/data": {"a1": {
                "__type__": "vector_store",
                "__data__": json!({"nodes_dict": {"0": "n2", "1": "n1"}}).to_string()
            }}}),
        );
        write(
            tmp.path(),
            DOCSTORE_FILE,
            &json!({"docstore/data": {
                "n1": {"__data__": {"text": "first"}},
                "n2": {"__data__": {"text": "second"}}
            }}),
        );

        let store = read_store(tmp.path()).unwrap_or_else(|_| unreachable!());
        assert_eq!(store.passages[0].id, "n1");
        assert_eq!(store.passages[0].text, "first");
        assert_eq!(store.vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_embedding_without_text() {
        let tmp = TempDir::new().unwrap_or_else(|_| unreachable!());
        write(
            tmp.path(),
            VECTOR_STORE_FILE,
            &json!({"embedding_dict": {"orphan": [1.0]}}),
        );
        write(tmp.path(), DOCSTORE_FILE, &json!({"docstore/data": {}}));
        let result = read_store(tmp.path());
        assert!(matches!(result, Err(IndexError::Malformed { .. })));
    }
}
