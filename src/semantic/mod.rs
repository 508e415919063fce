//! Semantic retrieval infrastructure for book descriptions.
//!
//! This module provides local semantic search using fastembed-rs for
//! generating embeddings and in-memory vector similarity search.
//!
//! # Architecture
//!
//! - `embeddings`: the `Embedder` capability and its fastembed implementation
//! - `index`: in-memory vector index with cosine similarity search

pub mod embeddings;
mod index;

pub use embeddings::{Embedder, EmbeddingError, EmbeddingModel};
pub use index::{IndexError, SearchHit, VectorIndex};

/// Default embedding model name
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
