//! Configuration surface for the retrieval engine
//!
//! Everything the core consumes is collected in [`RetrieverConfig`]:
//! chunking parameters, the embedding backend selection (delegated to
//! [`EmbedConfig`]), search defaults, the context character budget, and the
//! watch cadence. Configs load from a TOML file; every field has a default
//! matching the shipped system, so a missing file or a partial file both
//! work.

use anyhow::{Context, Result};
use docdex_embed::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Directory of documents to index; only immediate children are scanned.
    pub docs_path: PathBuf,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters, below `chunk_size`.
    pub chunk_overlap: usize,
    /// Paragraph separator used by the chunker.
    pub separator: String,
    /// Minimum base similarity for search candidates. The default of -1.0
    /// admits everything, leaving ordering to the hybrid ranker.
    pub similarity_threshold: f32,
    /// Default number of search results.
    pub limit: usize,
    /// Character budget for assembled context blocks.
    pub max_context_chars: usize,
    /// Seconds between watch-mode indexing passes.
    pub watch_interval_secs: u64,
    /// Embedding backend configuration.
    pub embedding: EmbedConfig,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            docs_path: PathBuf::from("docs"),
            chunk_size: 1000,
            chunk_overlap: 200,
            separator: "\n\n".to_string(),
            similarity_threshold: -1.0,
            limit: 5,
            max_context_chars: 8000,
            watch_interval_secs: 30,
            embedding: EmbedConfig::default(),
        }
    }
}

impl RetrieverConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// The watch cadence as a [`Duration`].
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}
