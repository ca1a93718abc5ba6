//! Indexing orchestration: change detection, chunking, embedding, storage
//!
//! The [`Indexer`] owns the full pipeline for one documents directory:
//!
//! ```text
//! directory scan → fingerprint gate → parse → chunk → embed (batch) → replace-write
//! ```
//!
//! Files are processed sequentially so a chunk-replacement transaction is
//! never interleaved with another write for the same filename. A per-file
//! failure is logged and excluded from the pass: one bad file never aborts
//! a directory pass. The watch loop re-runs the pass on a fixed cadence
//! until [`Indexer::stop_watching`] is called; the stop flag is honored at
//! pass boundaries, not mid-file.

use crate::retrieval::fingerprint::file_fingerprint;
use crate::retrieval::parser::{DocumentConverter, DocumentParser};
use crate::retrieval::ranking::{self, RetrievalResult};
use crate::storage::{
    DocumentChunk, DocumentStore, META_FILE_HASH, META_FILEPATH, META_INDEXED_AT,
};
use anyhow::{Context, Result};
use docdex_context::{ContextAssembler, ContextPassage, TextChunker};
use docdex_embed::EmbeddingProvider;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Threshold that disables similarity filtering: cosine similarity can never
/// fall below -1.0, so every candidate passes. This is the default operating
/// mode for context assembly, which wants ranking over the full candidate
/// set rather than a hard cutoff.
pub const PERMISSIVE_THRESHOLD: f32 = -1.0;

/// Document indexer and hybrid retriever for one watched directory.
pub struct Indexer {
    docs_path: PathBuf,
    chunker: TextChunker,
    parser: DocumentParser,
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn EmbeddingProvider>,
    default_limit: usize,
    max_context_chars: usize,
    running: AtomicBool,
    // Advisory per-filename locks: concurrent index_file calls for the same
    // filename serialize on these instead of racing the replace transaction.
    file_locks: StdMutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("docs_path", &self.docs_path)
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

impl Indexer {
    pub fn new(
        docs_path: PathBuf,
        chunker: TextChunker,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn EmbeddingProvider>,
        converter: Option<Arc<dyn DocumentConverter>>,
        default_limit: usize,
        max_context_chars: usize,
    ) -> Self {
        Self {
            docs_path,
            chunker,
            parser: DocumentParser::new(converter),
            store,
            provider,
            default_limit,
            max_context_chars,
            running: AtomicBool::new(false),
            file_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Directory this indexer scans.
    pub fn docs_path(&self) -> &Path {
        &self.docs_path
    }

    fn file_lock(&self, filename: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.file_locks.lock().unwrap();
        Arc::clone(
            locks
                .entry(filename.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Index a single file, returning the number of chunks now stored for it.
    ///
    /// Returns `Ok(0)` for skipped files (unsupported type, temp file, empty
    /// content) and the existing chunk count when the content fingerprint is
    /// unchanged. A hard failure (embedding backend, store write) propagates
    /// as an error and leaves the file's previous chunk set intact.
    pub async fn index_file(&self, path: &Path) -> Result<usize> {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
        else {
            debug!("Skipping file with non-UTF-8 name: {}", path.display());
            return Ok(0);
        };

        if DocumentParser::is_temp_file(&filename) {
            debug!("Skipping temp file: {filename}");
            return Ok(0);
        }
        if !self.parser.supports(path) {
            debug!("Skipping unsupported file: {filename}");
            return Ok(0);
        }

        let lock = self.file_lock(&filename);
        let _guard = lock.lock().await;

        let fingerprint = file_fingerprint(path).await?;

        // The stored chunks are the only source of truth for the previous
        // fingerprint. Skip only when the hash matches AND the stored vectors
        // match the active provider's dimension; a provider swap must force
        // re-embedding even for unchanged files.
        let existing = self.store.get_chunks(&filename).await?;
        if let Some(first) = existing.first() {
            let hash_matches = first.file_hash() == Some(fingerprint.as_str());
            let dimension_matches = first.embedding.len() == self.provider.dimension();
            if hash_matches && dimension_matches {
                debug!("File unchanged (hash match), skipping: {filename}");
                return Ok(existing.len());
            }
            if hash_matches && !dimension_matches {
                warn!(
                    "Embedding dimension changed ({} -> {}), re-indexing: {filename}",
                    first.embedding.len(),
                    self.provider.dimension()
                );
            }
        }

        let Some(content) = self.parser.parse(path).await? else {
            return Ok(0);
        };
        if content.trim().is_empty() {
            debug!("Skipping empty file: {filename}");
            return Ok(0);
        }

        let chunks = self.chunker.split(&content);
        if chunks.is_empty() {
            return Ok(0);
        }
        let total_chunks = chunks.len();

        let embeddings = self
            .provider
            .embed_batch(&chunks)
            .await
            .with_context(|| format!("embedding failed for {filename}"))?;
        anyhow::ensure!(
            embeddings.len() == total_chunks,
            "embedding backend returned {} vectors for {} chunks",
            embeddings.len(),
            total_chunks
        );

        let indexed_at = chrono::Utc::now().to_rfc3339();
        let documents: Vec<DocumentChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (content, embedding))| {
                let mut metadata = HashMap::new();
                metadata.insert(META_FILE_HASH.to_string(), fingerprint.clone());
                metadata.insert(META_INDEXED_AT.to_string(), indexed_at.clone());
                metadata.insert(META_FILEPATH.to_string(), path.display().to_string());
                DocumentChunk {
                    filename: filename.clone(),
                    content,
                    chunk_index,
                    total_chunks,
                    embedding,
                    metadata,
                }
            })
            .collect();

        if !existing.is_empty() {
            info!("Updating {filename} (hash changed)");
        }
        self.store
            .replace_chunks(&filename, &documents)
            .await
            .with_context(|| format!("store write failed for {filename}"))?;

        info!("Indexed {filename}: {total_chunks} chunks");
        Ok(total_chunks)
    }

    /// Run one indexing pass over the watched directory (immediate children
    /// only), returning chunk counts for files that produced at least one
    /// chunk. Stored filenames no longer present on disk are pruned.
    pub async fn index_directory(&self) -> Result<BTreeMap<String, usize>> {
        let mut results = BTreeMap::new();

        if !self.docs_path.exists() {
            warn!("Docs path does not exist: {}", self.docs_path.display());
            return Ok(results);
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut entries = tokio::fs::read_dir(&self.docs_path)
            .await
            .with_context(|| format!("failed to scan {}", self.docs_path.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let filename = entry.file_name().to_string_lossy().into_owned();
            if DocumentParser::is_temp_file(&filename) {
                continue;
            }
            seen.insert(filename.clone());

            match self.index_file(&entry.path()).await {
                Ok(chunks) if chunks > 0 => {
                    results.insert(filename, chunks);
                }
                Ok(_) => {}
                // A failed file keeps its previous chunk set and the pass
                // moves on to the next file.
                Err(e) => error!("Failed to index {filename}: {e:#}"),
            }
        }

        self.prune_removed(&seen).await?;

        info!(
            "Indexed {} files with total chunks: {}",
            results.len(),
            results.values().sum::<usize>()
        );
        Ok(results)
    }

    /// Delete chunks for stored filenames the latest pass no longer saw.
    async fn prune_removed(&self, seen: &HashSet<String>) -> Result<()> {
        for stored in self.store.list_filenames().await? {
            if !seen.contains(&stored) {
                let removed = self.store.delete_chunks(&stored).await?;
                info!("Pruned {removed} chunks for removed file: {stored}");
            }
        }
        Ok(())
    }

    /// Re-index the directory on a fixed cadence until [`Self::stop_watching`].
    ///
    /// Errors during a pass are logged and the loop continues on the next
    /// tick. The stop flag is checked between passes; a stop requested
    /// mid-pass takes effect once the current pass completes.
    pub async fn watch_directory(&self, interval: Duration) {
        self.running.store(true, Ordering::SeqCst);
        info!(
            "Starting directory watcher for {} (every {}s)",
            self.docs_path.display(),
            interval.as_secs()
        );

        while self.running.load(Ordering::SeqCst) {
            if let Err(e) = self.index_directory().await {
                error!("Error during directory watch pass: {e:#}");
            }
            tokio::time::sleep(interval).await;
        }

        info!("Directory watcher stopped");
    }

    /// Request the watch loop to exit at its next check point.
    pub fn stop_watching(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Hybrid search: embed the query, fetch `2 x limit` nearest candidates
    /// above `similarity_threshold`, then re-rank with the keyword boost.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        similarity_threshold: f32,
    ) -> Result<Vec<RetrievalResult>> {
        let query_embedding = self
            .provider
            .embed(query)
            .await
            .context("failed to embed query")?;

        let candidates = self
            .store
            .nearest(&query_embedding, limit * 2, similarity_threshold)
            .await
            .context("nearest-neighbor search failed")?;

        let keywords = ranking::extract_keywords(query);
        Ok(ranking::rank(candidates, &keywords, limit))
    }

    /// Search with the permissive threshold and assemble the results into a
    /// bounded context block. Returns the empty string when nothing relevant
    /// is indexed; callers must branch on that rather than fabricate an
    /// answer. Retrieval failures propagate as errors, distinguishable from
    /// the empty block.
    pub async fn search_context(&self, query: &str) -> Result<String> {
        info!("Searching knowledge base for: '{query}'");
        let results = self
            .search(query, self.default_limit, PERMISSIVE_THRESHOLD)
            .await?;

        if results.is_empty() {
            info!("No results found for query: '{query}'");
            return Ok(String::new());
        }

        for (idx, result) in results.iter().enumerate() {
            debug!(
                "  {}. [{}] similarity={:.4} boost={:.2}",
                idx + 1,
                result.filename,
                result.similarity,
                result.keyword_boost
            );
        }

        let passages: Vec<ContextPassage> = results
            .into_iter()
            .map(|result| ContextPassage {
                source: result.filename,
                score: result.similarity,
                content: result.content,
            })
            .collect();

        let context = ContextAssembler::new(self.max_context_chars).build_context(&passages);
        info!("Built context block: {} chars", context.len());
        Ok(context)
    }
}
