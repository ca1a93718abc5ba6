//! SQLite implementation of the document store
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE document_chunks (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     filename TEXT NOT NULL,          -- logical source identity
//!     content TEXT NOT NULL,           -- chunk text
//!     chunk_index INTEGER NOT NULL,    -- ordinal within the source file
//!     total_chunks INTEGER NOT NULL,   -- sibling count
//!     embedding BLOB NOT NULL,         -- f32 vector, little-endian
//!     metadata TEXT NOT NULL,          -- JSON object (file_hash, indexed_at, ...)
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
//!     CONSTRAINT unique_document_chunk UNIQUE(filename, chunk_index)
//! );
//! ```
//!
//! ## SQLite Configuration
//!
//! - **WAL mode**: concurrent reads while the indexer writes
//! - **Large page size** (64KB): embedding blobs dominate row size
//! - **Busy timeout**: the watch loop and an explicit pass may contend
//!
//! Nearest-neighbor search loads the stored vectors and computes cosine
//! similarity in memory; at the corpus sizes this engine serves (one
//! support-document folder) that is faster than maintaining an ANN index.

use super::{DocumentChunk, DocumentStore, ScoredChunk, StoreStats};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;

/// Database filename created inside the base directory.
pub const DB_FILENAME: &str = ".docdex.db";

/// SQLite-backed [`DocumentStore`]. See module docs for schema details.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the store database inside `base`.
    pub async fn open(base: &Path) -> Result<Self> {
        let db_path = base.join(DB_FILENAME);

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .create_if_missing(true)
                .page_size(1 << 16),
        )
        .await?;
        Self::new_with_pool(pool).await
    }

    /// Open an in-memory store for testing.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS document_chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                content TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                total_chunks INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                CONSTRAINT unique_document_chunk UNIQUE(filename, chunk_index)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_document_chunks_filename ON document_chunks(filename)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentChunk> {
        let filename: String = row.get("filename");
        let content: String = row.get("content");
        let chunk_index: i64 = row.get("chunk_index");
        let total_chunks: i64 = row.get("total_chunks");
        let embedding_bytes: Vec<u8> = row.get("embedding");
        let metadata_json: String = row.get("metadata");

        let embedding = bytemuck::pod_collect_to_vec::<u8, f32>(&embedding_bytes);
        let metadata: HashMap<String, String> = serde_json::from_str(&metadata_json)
            .with_context(|| format!("corrupt chunk metadata for {filename}"))?;

        Ok(DocumentChunk {
            filename,
            content,
            chunk_index: chunk_index as usize,
            total_chunks: total_chunks as usize,
            embedding,
            metadata,
        })
    }

    async fn insert_chunk_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        chunk: &DocumentChunk,
    ) -> Result<()> {
        let embedding_bytes = bytemuck::cast_slice::<f32, u8>(&chunk.embedding);
        let metadata_json = serde_json::to_string(&chunk.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO document_chunks (filename, content, chunk_index, total_chunks, embedding, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(filename, chunk_index) DO UPDATE SET
                content = excluded.content,
                total_chunks = excluded.total_chunks,
                embedding = excluded.embedding,
                metadata = excluded.metadata
            "#,
        )
        .bind(&chunk.filename)
        .bind(&chunk.content)
        .bind(chunk.chunk_index as i64)
        .bind(chunk.total_chunks as i64)
        .bind(embedding_bytes)
        .bind(metadata_json)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn upsert_chunk(&self, chunk: &DocumentChunk) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::insert_chunk_tx(&mut tx, chunk).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_chunks(&self, filename: &str, chunks: &[DocumentChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM document_chunks WHERE filename = ?1")
            .bind(filename)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            Self::insert_chunk_tx(&mut tx, chunk).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_chunks(&self, filename: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM document_chunks WHERE filename = ?1")
            .bind(filename)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn get_chunks(&self, filename: &str) -> Result<Vec<DocumentChunk>> {
        let rows = sqlx::query(
            "SELECT filename, content, chunk_index, total_chunks, embedding, metadata
             FROM document_chunks WHERE filename = ?1 ORDER BY chunk_index",
        )
        .bind(filename)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_chunk).collect()
    }

    async fn nearest(
        &self,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            "SELECT filename, content, chunk_index, total_chunks, embedding, metadata
             FROM document_chunks",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::new();
        for row in &rows {
            let chunk = Self::row_to_chunk(row)?;
            let base_similarity = cosine_similarity(embedding, &chunk.embedding);
            if base_similarity >= threshold {
                scored.push(ScoredChunk {
                    chunk,
                    base_similarity,
                });
            }
        }

        scored.sort_by(|a, b| {
            b.base_similarity
                .partial_cmp(&a.base_similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn list_filenames(&self) -> Result<Vec<String>> {
        let rows =
            sqlx::query("SELECT DISTINCT filename FROM document_chunks ORDER BY filename")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(|row| row.get("filename")).collect())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS chunk_count, COUNT(DISTINCT filename) AS file_count
             FROM document_chunks",
        )
        .fetch_one(&self.pool)
        .await?;
        let chunk_count: i64 = row.get("chunk_count");
        let file_count: i64 = row.get("file_count");
        Ok(StoreStats {
            chunk_count: chunk_count as usize,
            file_count: file_count as usize,
        })
    }
}

/// Cosine similarity between two vectors; 0.0 for mismatched dimensions or
/// zero-magnitude input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot_product += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::META_FILE_HASH;

    fn chunk(filename: &str, index: usize, total: usize, embedding: Vec<f32>) -> DocumentChunk {
        let mut metadata = HashMap::new();
        metadata.insert(META_FILE_HASH.to_string(), format!("hash-of-{filename}"));
        DocumentChunk {
            filename: filename.to_string(),
            content: format!("content of {filename} chunk {index}"),
            chunk_index: index,
            total_chunks: total,
            embedding,
            metadata,
        }
    }

    #[tokio::test]
    async fn test_chunk_round_trip() -> Result<()> {
        let store = SqliteStore::open_memory().await?;

        let original = chunk("faq.md", 0, 2, vec![0.1, 0.2, 0.3]);
        store.upsert_chunk(&original).await?;
        store.upsert_chunk(&chunk("faq.md", 1, 2, vec![0.4, 0.5, 0.6])).await?;

        let fetched = store.get_chunks("faq.md").await?;
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].content, original.content);
        assert_eq!(fetched[0].embedding, original.embedding);
        assert_eq!(fetched[0].file_hash(), Some("hash-of-faq.md"));
        assert_eq!(fetched[1].chunk_index, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_is_keyed_by_filename_and_index() -> Result<()> {
        let store = SqliteStore::open_memory().await?;

        store.upsert_chunk(&chunk("a.txt", 0, 1, vec![1.0, 0.0])).await?;
        let mut updated = chunk("a.txt", 0, 1, vec![0.0, 1.0]);
        updated.content = "rewritten".to_string();
        store.upsert_chunk(&updated).await?;

        let fetched = store.get_chunks("a.txt").await?;
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].content, "rewritten");
        assert_eq!(fetched[0].embedding, vec![0.0, 1.0]);

        Ok(())
    }

    #[tokio::test]
    async fn test_replace_chunks_swaps_whole_set() -> Result<()> {
        let store = SqliteStore::open_memory().await?;

        let old: Vec<_> = (0..3).map(|i| chunk("doc.txt", i, 3, vec![0.1; 4])).collect();
        store.replace_chunks("doc.txt", &old).await?;
        assert_eq!(store.get_chunks("doc.txt").await?.len(), 3);

        // Replacement with a smaller set leaves no orphan rows behind.
        let new: Vec<_> = (0..2).map(|i| chunk("doc.txt", i, 2, vec![0.2; 4])).collect();
        store.replace_chunks("doc.txt", &new).await?;

        let fetched = store.get_chunks("doc.txt").await?;
        assert_eq!(fetched.len(), 2);
        assert!(fetched.iter().all(|c| c.total_chunks == 2));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_chunks() -> Result<()> {
        let store = SqliteStore::open_memory().await?;
        store.upsert_chunk(&chunk("gone.txt", 0, 1, vec![0.5, 0.5])).await?;

        assert_eq!(store.delete_chunks("gone.txt").await?, 1);
        assert!(store.get_chunks("gone.txt").await?.is_empty());
        assert_eq!(store.delete_chunks("gone.txt").await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_nearest_orders_and_filters() -> Result<()> {
        let store = SqliteStore::open_memory().await?;

        store.upsert_chunk(&chunk("close.txt", 0, 1, vec![1.0, 0.0])).await?;
        store.upsert_chunk(&chunk("near.txt", 0, 1, vec![0.8, 0.6])).await?;
        store.upsert_chunk(&chunk("far.txt", 0, 1, vec![-1.0, 0.0])).await?;

        let results = store.nearest(&[1.0, 0.0], 10, -1.0).await?;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.filename, "close.txt");
        assert_eq!(results[1].chunk.filename, "near.txt");
        assert_eq!(results[2].chunk.filename, "far.txt");

        // Threshold drops the opposite-direction vector.
        let results = store.nearest(&[1.0, 0.0], 10, 0.0).await?;
        assert_eq!(results.len(), 2);

        // Limit truncates after ordering.
        let results = store.nearest(&[1.0, 0.0], 1, -1.0).await?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.filename, "close.txt");

        Ok(())
    }

    #[tokio::test]
    async fn test_stats_and_list_filenames() -> Result<()> {
        let store = SqliteStore::open_memory().await?;

        let stats = store.stats().await?;
        assert_eq!(stats.chunk_count, 0);
        assert_eq!(stats.file_count, 0);

        store.upsert_chunk(&chunk("b.txt", 0, 2, vec![0.0])).await?;
        store.upsert_chunk(&chunk("b.txt", 1, 2, vec![0.0])).await?;
        store.upsert_chunk(&chunk("a.txt", 0, 1, vec![0.0])).await?;

        let stats = store.stats().await?;
        assert_eq!(stats.chunk_count, 3);
        assert_eq!(stats.file_count, 2);

        assert_eq!(store.list_filenames().await?, vec!["a.txt", "b.txt"]);

        Ok(())
    }

    #[test]
    fn test_cosine_similarity() {
        // Identical vectors
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);

        // Orthogonal vectors
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);

        // Opposite vectors
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);

        // Unnormalized input
        let similarity = cosine_similarity(&[0.6, 0.8], &[0.8, 0.6]);
        assert!((similarity - 0.96).abs() < 1e-3);

        // Zero vectors
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);

        // Mismatched dimensions
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }
}
