//! Recommendation engine.
//!
//! Orchestrates the retrieval pipeline: embed the query, search the vector
//! index, recover ISBNs from the matched corpus lines, join against the book
//! catalog, filter by category and re-rank by tone.
//!
//! The corpus, index and catalog are built once on first use behind a mutex
//! and treated as read-only afterwards; concurrent first callers serialize on
//! the mutex and exactly one initialization runs. A failed initialization
//! leaves the slot empty so the next call retries. The mutex only guards the
//! initialization slot: queries take an `Arc` snapshot of the built state and
//! run on it with the lock released, so they never block each other.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::catalog::{self, BookCatalog, BookRecord, CatalogError, Tone, CATEGORY_ALL};
use crate::corpus::{recover_isbn, AtomicDocument, CorpusError, TagParse, TaggedCorpus};
use crate::semantic::{Embedder, EmbeddingError, IndexError, VectorIndex};

/// Size of the initial retrieval window, before filtering.
pub const DEFAULT_INITIAL_K: usize = 50;
/// Size cap of the returned result set.
pub const DEFAULT_FINAL_K: usize = 16;

/// One recommendation request.
///
/// `category` of "All" (any case) or absent means no filtering; an
/// unrecognized or absent `tone` means no re-ranking.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationQuery {
    pub text: String,
    pub category: Option<String>,
    pub tone: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("query text is empty")]
    EmptyQuery,

    #[error("corpus unavailable: {0}")]
    Corpus(#[from] CorpusError),

    #[error("catalog unavailable: {0}")]
    Catalog(#[from] CatalogError),

    #[error("embedding service error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// True for caller-input problems (mapped to a client-visible rejection
    /// rather than a degraded empty result).
    pub fn is_client_error(&self) -> bool {
        matches!(self, EngineError::EmptyQuery)
    }
}

/// Built-once shared state: documents aligned with index ordinals, plus the
/// metadata table.
struct EngineState {
    documents: Vec<AtomicDocument>,
    index: VectorIndex,
    catalog: BookCatalog,
}

/// The recommendation pipeline. Stateless per request apart from the
/// lazily-built `EngineState`.
pub struct RecommendationEngine {
    corpus_path: PathBuf,
    catalog_path: PathBuf,
    embedder: Arc<dyn Embedder>,
    initial_k: usize,
    final_k: usize,
    /// Initialization slot; holds an immutable handle once built.
    state: Mutex<Option<Arc<EngineState>>>,
}

impl RecommendationEngine {
    pub fn new(
        corpus_path: PathBuf,
        catalog_path: PathBuf,
        embedder: Arc<dyn Embedder>,
        initial_k: usize,
        final_k: usize,
    ) -> Self {
        Self {
            corpus_path,
            catalog_path,
            embedder,
            initial_k,
            final_k,
            state: Mutex::new(None),
        }
    }

    /// Answer a query with at most the configured `final_k` records.
    pub fn recommend(&self, query: &RecommendationQuery) -> Result<Vec<BookRecord>, EngineError> {
        self.recommend_capped(query, self.final_k)
    }

    /// Same as [`recommend`](Self::recommend) with a per-call result cap.
    pub fn recommend_capped(
        &self,
        query: &RecommendationQuery,
        final_k: usize,
    ) -> Result<Vec<BookRecord>, EngineError> {
        let text = query.text.trim();
        if text.is_empty() {
            return Err(EngineError::EmptyQuery);
        }

        // snapshot releases the init lock; everything below is read-only
        let state = self.ensure_initialized()?;

        if state.index.is_empty() {
            return Ok(vec![]);
        }

        let query_embedding = self.embedder.embed(text)?;
        let hits = state.index.search(&query_embedding, self.initial_k)?;

        // Recover ISBNs in similarity order, dropping malformed lines and
        // deduplicating on first occurrence.
        let mut seen = HashSet::new();
        let mut isbns = Vec::new();
        for hit in hits {
            match recover_isbn(&state.documents[hit.doc].content) {
                TagParse::Isbn(isbn) => {
                    if seen.insert(isbn) {
                        isbns.push(isbn);
                    }
                }
                // expected for malformed corpus rows
                TagParse::Skip(_) => {}
            }
        }

        let mut matched = state.catalog.lookup_by_isbns(&isbns);
        matched.truncate(self.initial_k);

        if let Some(category) = real_category(query.category.as_deref()) {
            matched = catalog::filter_by_category(matched, category);
        }
        matched.truncate(final_k);

        if let Some(tone) = query.tone.as_deref().and_then(Tone::parse) {
            // stable sort keeps similarity order among equal scores
            matched.sort_by(|a, b| {
                tone.score(&b.emotions)
                    .partial_cmp(&tone.score(&a.emotions))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        Ok(matched.into_iter().cloned().collect())
    }

    /// Distinct catalog categories, for filter dropdowns.
    pub fn categories(&self) -> Result<Vec<String>, EngineError> {
        let state = self.ensure_initialized()?;
        Ok(state.catalog.categories())
    }

    /// Number of indexed corpus documents. Returns 0 if not yet initialized.
    pub fn document_count(&self) -> usize {
        self.snapshot().map(|s| s.documents.len()).unwrap_or(0)
    }

    /// Number of loaded book records. Returns 0 if not yet initialized.
    pub fn record_count(&self) -> usize {
        self.snapshot().map(|s| s.catalog.len()).unwrap_or(0)
    }

    /// Check if the engine has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Force initialization. Normally it happens lazily on the first query.
    pub fn initialize(&self) -> Result<(), EngineError> {
        self.ensure_initialized().map(|_| ())
    }

    /// Clone the built state out of the slot without triggering a build.
    fn snapshot(&self) -> Option<Arc<EngineState>> {
        self.state.lock().ok().and_then(|guard| guard.clone())
    }

    /// Ensure the engine is initialized, initializing if needed, and hand
    /// back an immutable handle to the built state.
    fn ensure_initialized(&self) -> Result<Arc<EngineState>, EngineError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| EngineError::Internal(format!("Lock poisoned: {}", e)))?;

        if let Some(state) = guard.as_ref() {
            return Ok(state.clone());
        }

        let state = Arc::new(self.do_init()?);
        *guard = Some(state.clone());
        Ok(state)
    }

    /// Perform actual initialization: load corpus and catalog, embed every
    /// document, build the index.
    fn do_init(&self) -> Result<EngineState, EngineError> {
        log::info!(
            "building recommendation index from {}",
            self.corpus_path.display()
        );

        let corpus = TaggedCorpus::load(&self.corpus_path)?;
        let catalog = BookCatalog::load(&self.catalog_path)?;

        let documents: Vec<AtomicDocument> = corpus.documents().collect();
        let contents: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&contents)?;

        // index ordinals must map 1:1 onto documents
        if embeddings.len() != documents.len() {
            return Err(EngineError::Internal(format!(
                "embedder returned {} vectors for {} documents",
                embeddings.len(),
                documents.len()
            )));
        }

        let dimensions = embeddings.first().map(|e| e.len()).unwrap_or(0);
        let mut index = VectorIndex::with_capacity(dimensions, embeddings.len());
        for embedding in embeddings {
            index.push(embedding)?;
        }

        log::info!(
            "indexed {} documents against {} book records",
            index.len(),
            catalog.len()
        );

        Ok(EngineState {
            documents,
            index,
            catalog,
        })
    }
}

/// Treat "All" (any case), empty, or absent categories as "no filter".
fn real_category(category: Option<&str>) -> Option<&str> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case(CATEGORY_ALL))
}
