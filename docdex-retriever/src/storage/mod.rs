//! Storage abstraction for document chunks and their embeddings
//!
//! This module defines the store contract the retrieval engine depends on.
//! The engine never issues raw queries; everything goes through
//! [`DocumentStore`], so the SQLite implementation in [`sqlite_store`] can
//! be swapped for another backend without touching the pipeline.
//!
//! ## Key Components
//!
//! - **DocumentChunk**: the persisted unit of retrieval, one row per chunk
//! - **ScoredChunk**: a chunk paired with its raw vector similarity
//! - **DocumentStore**: upsert/replace/delete/get/nearest operations
//!
//! ## Invariants
//!
//! - `(filename, chunk_index)` is unique across the store
//! - every chunk of a file carries the same `file_hash` metadata entry
//! - every stored embedding has the dimension of the provider that wrote it;
//!   re-indexing a file replaces its whole chunk set atomically, never a
//!   partial subset

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub mod sqlite_store;

/// Metadata key for the source file's content fingerprint at indexing time.
pub const META_FILE_HASH: &str = "file_hash";
/// Metadata key for the RFC 3339 indexing timestamp.
pub const META_INDEXED_AT: &str = "indexed_at";
/// Metadata key for the absolute source path at indexing time.
pub const META_FILEPATH: &str = "filepath";

/// One persisted chunk of a source document.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DocumentChunk {
    /// Logical source identity; unique together with `chunk_index`.
    pub filename: String,
    /// Chunk text, never empty.
    pub content: String,
    /// Ordinal position within the source file, `0 <= chunk_index < total_chunks`.
    pub chunk_index: usize,
    /// Number of sibling chunks produced from the same file.
    pub total_chunks: usize,
    /// Embedding vector; same length as every other chunk in the store.
    pub embedding: Vec<f32>,
    /// Free-form key/value map, always carrying [`META_FILE_HASH`] and
    /// [`META_INDEXED_AT`].
    pub metadata: HashMap<String, String>,
}

impl DocumentChunk {
    /// The content fingerprint recorded when this chunk was written.
    pub fn file_hash(&self) -> Option<&str> {
        self.metadata.get(META_FILE_HASH).map(String::as_str)
    }
}

/// A chunk returned from nearest-neighbor search with its raw vector score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub base_similarity: f32,
}

/// Aggregate counts over the store.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StoreStats {
    pub chunk_count: usize,
    pub file_count: usize,
}

/// Persistence operations for document chunks.
///
/// The indexer is the sole writer; retrieval is read-only. Writes that
/// replace a file's chunk set must be all-or-nothing so a crash mid-replace
/// never leaves a filename with a mixed old/new chunk set.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or update a single chunk keyed by `(filename, chunk_index)`.
    async fn upsert_chunk(&self, chunk: &DocumentChunk) -> Result<()>;

    /// Atomically replace all chunks for `filename` with `chunks`.
    async fn replace_chunks(&self, filename: &str, chunks: &[DocumentChunk]) -> Result<()>;

    /// Delete every chunk for `filename`, returning how many were removed.
    async fn delete_chunks(&self, filename: &str) -> Result<usize>;

    /// All chunks for `filename`, ordered by `chunk_index`.
    async fn get_chunks(&self, filename: &str) -> Result<Vec<DocumentChunk>>;

    /// The `limit` chunks most similar to `embedding`, filtered by
    /// `base_similarity >= threshold`, ordered by similarity descending.
    async fn nearest(
        &self,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredChunk>>;

    /// Distinct filenames currently present in the store.
    async fn list_filenames(&self) -> Result<Vec<String>>;

    /// Chunk and file counts.
    async fn stats(&self) -> Result<StoreStats>;
}
