//! Vectors from a binary FAISS index file.
//!
//! Only flat indexes are read: their stored vectors are copied out by
//! position and searched like any other [`DocumentIndex`](super::DocumentIndex).

use std::path::Path;

use faiss::Index;

use crate::error::IndexError;

/// Reads every vector of a flat FAISS index, in position order.
pub(super) fn read_vectors(path: &Path) -> Result<Vec<Vec<f32>>, IndexError> {
    let malformed = |message: String| IndexError::Malformed {
        path: path.to_path_buf(),
        message,
    };

    let file_name = path
        .to_str()
        .ok_or_else(|| malformed("index path is not valid UTF-8".to_string()))?;
    let index = faiss::read_index(file_name).map_err(|e| malformed(format!("FAISS read failed: {e}")))?;
    let flat = index
        .into_flat()
        .map_err(|e| malformed(format!("only flat FAISS indexes are supported: {e}")))?;

    let dimension = usize::try_from(flat.d()).map_err(|e| malformed(e.to_string()))?;
    if dimension == 0 {
        return Err(malformed("FAISS index has zero dimension".to_string()));
    }
    let data = flat.xb();
    let total = usize::try_from(flat.ntotal()).map_err(|e| malformed(e.to_string()))?;
    if data.len() != total * dimension {
        return Err(malformed(format!(
            "FAISS index holds {} values, expected {total} x {dimension}",
            data.len()
        )));
    }

    Ok(data.chunks_exact(dimension).map(<[f32]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use faiss::index::flat::FlatIndexImpl;

    use super::*;

    #[test]
    fn test_reads_flat_vectors_in_position_order() {
        let tmp = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = tmp.path().join("default__vector_store.json");

        let mut index = FlatIndexImpl::new_l2(2).unwrap_or_else(|_| unreachable!());
        index
            .add(&[1.0, 0.0, 0.0, 1.0, 0.6, 0.8])
            .unwrap_or_else(|_| unreachable!());
        faiss::write_index(&index, &*path.to_string_lossy()).unwrap_or_else(|_| unreachable!());

        let vectors = read_vectors(&path).unwrap_or_else(|_| unreachable!());
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.8]]);
    }
}
