use anyhow::Context;
use homedir::my_home;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::engine::{DEFAULT_FINAL_K, DEFAULT_INITIAL_K};
use crate::semantic::DEFAULT_MODEL;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CORPUS_FILE: &str = "tagged_descriptions.txt";
const DEFAULT_CATALOG_FILE: &str = "books_cleaned.csv";
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Configuration for embedding generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Address the daemon listens on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Tagged description corpus, relative to the base path unless absolute
    #[serde(default = "default_corpus_file")]
    pub corpus_file: String,

    /// Cleaned catalog CSV, relative to the base path unless absolute
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Size of the initial retrieval window, before filtering
    #[serde(default = "default_initial_k")]
    pub initial_k: usize,

    /// Maximum number of returned recommendations
    #[serde(default = "default_final_k")]
    pub final_k: usize,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_corpus_file() -> String {
    DEFAULT_CORPUS_FILE.to_string()
}

fn default_catalog_file() -> String {
    DEFAULT_CATALOG_FILE.to_string()
}

fn default_initial_k() -> usize {
    DEFAULT_INITIAL_K
}

fn default_final_k() -> usize {
    DEFAULT_FINAL_K
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            corpus_file: default_corpus_file(),
            catalog_file: default_catalog_file(),
            embedding: EmbeddingConfig::default(),
            initial_k: default_initial_k(),
            final_k: default_final_k(),
            base_path: String::new(),
        }
    }
}

impl Config {
    /// Base directory for config and data files: `BOOKREC_BASE_PATH` if set,
    /// otherwise `~/.local/share/bookrec`.
    pub fn base_path() -> anyhow::Result<String> {
        if let Ok(path) = std::env::var("BOOKREC_BASE_PATH") {
            return Ok(path);
        }

        let home = my_home()
            .context("could not determine home directory")?
            .context("home directory path is empty")?;

        Ok(format!("{}/.local/share/bookrec", home.to_string_lossy()))
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let config_path = Path::new(base_path).join("config.yaml");

        // create new if does not exist
        if !config_path.exists() {
            std::fs::create_dir_all(base_path)
                .context("failed to create application base directory")?;
            std::fs::write(
                &config_path,
                serde_yml::to_string(&Self::default())?.as_bytes(),
            )
            .context("failed to write default config.yaml")?;
        }

        let config_str =
            std::fs::read_to_string(&config_path).context("failed to read config.yaml")?;
        let mut config: Self =
            serde_yml::from_str(&config_str).context("config.yaml is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Path::new(&self.base_path).join("config.yaml");
        std::fs::write(&config_path, serde_yml::to_string(self)?.as_bytes())
            .context("failed to write config.yaml")?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.listen_addr.trim().is_empty() {
            anyhow::bail!("listen_addr must not be empty");
        }

        if self.initial_k == 0 {
            anyhow::bail!("initial_k must be at least 1");
        }

        if self.final_k == 0 {
            anyhow::bail!("final_k must be at least 1");
        }

        if self.embedding.model.trim().is_empty() {
            anyhow::bail!("embedding.model must not be empty");
        }

        if self.embedding.download_timeout_secs == 0 {
            anyhow::bail!("embedding.download_timeout_secs must be greater than 0");
        }

        Ok(())
    }

    pub fn corpus_path(&self) -> PathBuf {
        Path::new(&self.base_path).join(&self.corpus_file)
    }

    pub fn catalog_path(&self) -> PathBuf {
        Path::new(&self.base_path).join(&self.catalog_file)
    }

    pub fn model_cache_path(&self) -> PathBuf {
        PathBuf::from(&self.base_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yml::from_str("initial_k: 100\n").unwrap();
        assert_eq!(config.initial_k, 100);
        assert_eq!(config.final_k, DEFAULT_FINAL_K);
        assert_eq!(config.embedding.model, DEFAULT_MODEL);
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
    }

    #[test]
    fn test_zero_k_rejected() {
        let mut config = Config::default();
        config.final_k = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.initial_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_with_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_str().unwrap();

        let config = Config::load_with(base).unwrap();
        assert!(dir.path().join("config.yaml").exists());
        assert_eq!(config.final_k, DEFAULT_FINAL_K);

        // second load reads the file back unchanged
        let reloaded = Config::load_with(base).unwrap();
        assert_eq!(reloaded.initial_k, config.initial_k);
    }

    #[test]
    fn test_absolute_file_overrides_base_path() {
        let mut config = Config::default();
        config.base_path = "/data/bookrec".to_string();
        config.corpus_file = "/srv/corpus/tagged_descriptions.txt".to_string();

        assert_eq!(
            config.corpus_path(),
            PathBuf::from("/srv/corpus/tagged_descriptions.txt")
        );
        assert_eq!(
            config.catalog_path(),
            PathBuf::from("/data/bookrec/books_cleaned.csv")
        );
    }
}
