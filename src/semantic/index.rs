//! In-memory vector index with cosine similarity search.
//!
//! Stores one embedding per atomic document, in insertion (corpus) order.
//! The index is built once and never mutated afterwards; a rebuild replaces
//! the whole structure.

/// Search result from the vector index. `doc` is the insertion ordinal of the
/// matched document.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub doc: usize,
    /// Cosine similarity score
    pub score: f32,
}

/// Exact k-nearest-neighbor index over cosine similarity.
pub struct VectorIndex {
    /// Embeddings in insertion order; the position is the document ordinal.
    entries: Vec<Vec<f32>>,
    /// Expected embedding dimensions
    dimensions: usize,
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cannot store or search with zero-norm vector")]
    ZeroNormVector,

    #[error("Search limit must be at least 1")]
    ZeroLimit,
}

impl VectorIndex {
    /// Create a new empty vector index with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: Vec::new(),
            dimensions,
        }
    }

    /// Create an index with pre-allocated capacity.
    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            dimensions,
        }
    }

    /// Get the expected embedding dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Get the number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an embedding, returning the ordinal it was stored under.
    ///
    /// Returns an error if the embedding has the wrong dimensions or zero
    /// norm (cannot be scored).
    pub fn push(&mut self, embedding: Vec<f32>) -> Result<usize, IndexError> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }

        if Self::l2_norm(&embedding) < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        self.entries.push(embedding);
        Ok(self.entries.len() - 1)
    }

    /// Search for the `k` most similar documents, best-first.
    ///
    /// `k` must be at least 1; if the index holds fewer than `k` documents,
    /// all of them are returned. Ties are broken by insertion order (the sort
    /// is stable).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if k == 0 {
            return Err(IndexError::ZeroLimit);
        }

        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let query_norm = Self::l2_norm(query);
        if query_norm < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        let mut results: Vec<SearchHit> = self
            .entries
            .iter()
            .enumerate()
            .map(|(doc, entry)| SearchHit {
                doc,
                score: Self::cosine_similarity(query, entry, query_norm),
            })
            .collect();

        // Stable sort by score descending keeps insertion order for ties
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        results.truncate(k);

        Ok(results)
    }

    /// Compute L2 norm of a vector.
    fn l2_norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Compute cosine similarity between two vectors.
    /// Assumes query_norm is precomputed for efficiency.
    fn cosine_similarity(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
        let target_norm = Self::l2_norm(target);
        if target_norm < f32::EPSILON {
            return 0.0;
        }

        let dot_product: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
        dot_product / (query_norm * target_norm)
    }
}
