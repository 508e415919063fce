//! Embedding generation.
//!
//! The engine only depends on the `Embedder` capability; the fastembed-backed
//! `EmbeddingModel` is the production implementation. The underlying model is
//! loaded lazily on first use (first use downloads it into the cache
//! directory), so constructing the wrapper is cheap.

use fastembed::{InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{mpsc, Mutex};
use std::time::Duration;

/// Default download timeout for model files (5 minutes)
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),

    #[error("Model download timed out after {0}s")]
    DownloadTimeout(u64),
}

/// Capability for turning text into embedding vectors.
///
/// Both the corpus build and query-time search must go through the same
/// implementation so vectors live in the same space.
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for multiple texts, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
pub struct EmbeddingModel {
    model_name: String,
    model_enum: fastembed::EmbeddingModel,
    cache_dir: PathBuf,
    download_timeout: Duration,
    state: Mutex<Option<TextEmbedding>>,
}

impl EmbeddingModel {
    /// Create a new embedding model with the given name.
    ///
    /// The model will be downloaded on first embed if not cached. Models are
    /// cached in the `models/` subdirectory of `cache_dir`.
    ///
    /// # Arguments
    /// * `model_name` - Name of the model (e.g., "all-MiniLM-L6-v2")
    /// * `cache_dir` - Directory to cache downloaded models
    /// * `download_timeout` - Timeout for model download, defaults to 5 minutes
    pub fn new(
        model_name: &str,
        cache_dir: PathBuf,
        download_timeout: Option<Duration>,
    ) -> Result<Self, EmbeddingError> {
        let model_enum = Self::parse_model_name(model_name)?;

        Ok(Self {
            model_name: model_name.to_string(),
            model_enum,
            cache_dir,
            download_timeout: download_timeout.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT),
            state: Mutex::new(None),
        })
    }

    /// Get the model name
    pub fn name(&self) -> &str {
        &self.model_name
    }

    fn load_model(&self) -> Result<TextEmbedding, EmbeddingError> {
        let models_dir = self.cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::InitFailed(format!("Failed to create models directory: {}", e))
        })?;

        log::info!("loading embedding model '{}'", self.model_name);

        let options = InitOptions::new(self.model_enum.clone())
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        // try_new blocks while downloading, so run it on its own thread and
        // stop waiting once the timeout elapses. A timed-out loader thread is
        // left to finish in the background; its result is discarded.
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(TextEmbedding::try_new(options));
        });

        match rx.recv_timeout(self.download_timeout) {
            Ok(result) => result.map_err(|e| EmbeddingError::InitFailed(e.to_string())),
            Err(_) => Err(EmbeddingError::DownloadTimeout(
                self.download_timeout.as_secs(),
            )),
        }
    }

    fn with_model<R>(
        &self,
        f: impl FnOnce(&mut TextEmbedding) -> Result<R, EmbeddingError>,
    ) -> Result<R, EmbeddingError> {
        let mut guard = self.state.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
        })?;

        if guard.is_none() {
            *guard = Some(self.load_model()?);
        }

        let model = guard
            .as_mut()
            .ok_or_else(|| EmbeddingError::InitFailed("model missing after load".to_string()))?;

        f(model)
    }

    /// Parse model name string to fastembed enum.
    fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
        match name.to_lowercase().as_str() {
            "all-minilm-l6-v2" | "allminiml6v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "all-minilm-l6-v2-q" | "allminiml6v2q" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q),
            "bge-small-en-v1.5" | "bgesmallenv15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-small-en-v1.5-q" | "bgesmallenv15q" => {
                Ok(fastembed::EmbeddingModel::BGESmallENV15Q)
            }
            "bge-base-en-v1.5" | "bgebaseenv15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-base-en-v1.5-q" | "bgebaseenv15q" => Ok(fastembed::EmbeddingModel::BGEBaseENV15Q),
            "bge-large-en-v1.5" | "bgelargeenv15" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
            "bge-large-en-v1.5-q" | "bgelargeenv15q" => {
                Ok(fastembed::EmbeddingModel::BGELargeENV15Q)
            }
            _ => Err(EmbeddingError::InvalidModel(format!(
                "Unknown model: {}. Supported models: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5 (add -q suffix for quantized)",
                name
            ))),
        }
    }
}

impl Embedder for EmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.with_model(|model| {
            let embeddings = model
                .embed(vec![text], None)
                .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

            embeddings.into_iter().next().ok_or_else(|| {
                EmbeddingError::EmbeddingFailed("No embedding returned".to_string())
            })
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        self.with_model(|model| {
            model
                .embed(texts.to_vec(), None)
                .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
        })
    }
}
