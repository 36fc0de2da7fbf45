//! In-memory vector index with cosine-similarity search.
//!
//! Embeddings are tied to entity/claim/document ids for approximate retrieval
//! only — never ownership or identity. Zero-magnitude vectors rank with
//! similarity 0 rather than producing NaN.

use crate::embeddings::cosine_similarity;
use crate::error::KnowledgeError;
use std::collections::HashMap;
use uuid::Uuid;

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: Uuid,
    pub similarity: f32,
}

/// Fixed-dimension vector index.
#[derive(Debug, Default)]
pub struct VectorIndex {
    dimensions: usize,
    vectors: HashMap<Uuid, Vec<f32>>,
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), KnowledgeError> {
        if vector.len() != self.dimensions {
            return Err(KnowledgeError::DimensionMismatch {
                expected: self.dimensions,
                got: vector.len(),
            });
        }
        Ok(())
    }

    /// Insert a vector for an id. Overwrites any existing vector.
    pub fn add(&mut self, id: Uuid, vector: Vec<f32>) -> Result<(), KnowledgeError> {
        self.check_dimensions(&vector)?;
        self.vectors.insert(id, vector);
        Ok(())
    }

    /// Remove the vector for an id. Returns whether it existed.
    pub fn remove(&mut self, id: &Uuid) -> bool {
        self.vectors.remove(id).is_some()
    }

    /// Replace the vector for an existing id.
    pub fn update(&mut self, id: Uuid, vector: Vec<f32>) -> Result<(), KnowledgeError> {
        self.check_dimensions(&vector)?;
        if !self.vectors.contains_key(&id) {
            return Err(KnowledgeError::EntityNotFound { id });
        }
        self.vectors.insert(id, vector);
        Ok(())
    }

    /// Top-k cosine-similarity search, ranked descending.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<VectorHit> {
        if k == 0 {
            return Vec::new();
        }

        let mut hits: Vec<VectorHit> = self
            .vectors
            .iter()
            .map(|(id, vector)| VectorHit {
                id: *id,
                similarity: cosine_similarity(query, vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{BagOfWordsEmbedder, Embedder};

    #[test]
    fn test_search_ranks_by_similarity() {
        let embedder = BagOfWordsEmbedder::new(64);
        let mut index = VectorIndex::new(64);

        let close_id = Uuid::new_v4();
        let far_id = Uuid::new_v4();
        index
            .add(close_id, embedder.embed("rust async tokio runtime"))
            .unwrap();
        index
            .add(far_id, embedder.embed("sourdough bread baking"))
            .unwrap();

        let hits = index.search(&embedder.embed("tokio async runtime"), 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, close_id);
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[test]
    fn test_search_k_zero_is_empty() {
        let mut index = VectorIndex::new(4);
        index.add(Uuid::new_v4(), vec![1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0, 0.0], 0).is_empty());
    }

    #[test]
    fn test_search_zero_vector_yields_zero_similarity() {
        let mut index = VectorIndex::new(4);
        index.add(Uuid::new_v4(), vec![1.0, 2.0, 3.0, 4.0]).unwrap();

        let hits = index.search(&[0.0; 4], 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].similarity, 0.0);
        assert!(!hits[0].similarity.is_nan());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = VectorIndex::new(4);
        let err = index.add(Uuid::new_v4(), vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, KnowledgeError::DimensionMismatch { expected: 4, got: 2 }));
    }

    #[test]
    fn test_update_missing_id_fails() {
        let mut index = VectorIndex::new(2);
        let id = Uuid::new_v4();
        let err = index.update(id, vec![1.0, 0.0]).unwrap_err();
        assert!(matches!(err, KnowledgeError::EntityNotFound { .. }));
    }

    #[test]
    fn test_remove() {
        let mut index = VectorIndex::new(2);
        let id = Uuid::new_v4();
        index.add(id, vec![1.0, 0.0]).unwrap();
        assert!(index.remove(&id));
        assert!(!index.remove(&id));
        assert!(index.is_empty());
    }
}
