//! docdex-retriever: document indexing and hybrid retrieval engine
//!
//! This crate turns a folder of heterogeneous support documents into
//! searchable, embedded chunks and answers natural-language queries with a
//! ranked, re-scored set of passages.
//!
//! ## Key Modules
//!
//! - **[`retrieval`]**: fingerprinting, parsing, the indexing pipeline, and
//!   hybrid ranking
//! - **[`storage`]**: the document store contract and its SQLite
//!   implementation
//! - **[`config`]**: the TOML-loadable configuration surface
//!
//! ## Architecture
//!
//! ```text
//! Directory scan → Fingerprint gate → Parser → Chunker → Embedder → SQLite
//!                                                                      ↓
//! Query → Embedder → nearest() → keyword re-rank → Context Assembler → caller
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docdex_retriever::config::RetrieverConfig;
//! use docdex_retriever::retrieval::indexer::Indexer;
//! use docdex_retriever::storage::sqlite_store::SqliteStore;
//! use docdex_context::TextChunker;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RetrieverConfig::default();
//! let store = Arc::new(SqliteStore::open(&config.docs_path).await?);
//! let provider = docdex_embed::create_provider(&config.embedding).await?;
//! let chunker = TextChunker::new(config.chunk_size, config.chunk_overlap, config.separator.clone());
//!
//! let indexer = Indexer::new(
//!     config.docs_path.clone(),
//!     chunker,
//!     store,
//!     provider,
//!     None,
//!     config.limit,
//!     config.max_context_chars,
//! );
//! indexer.index_directory().await?;
//! let context = indexer.search_context("What is the USSD code?").await?;
//! # Ok(())
//! # }
//! ```
//!
//! An empty context block means "no relevant knowledge found"; downstream
//! dialogue logic must branch on it instead of fabricating an answer. That
//! contract is the reason this subsystem exists.

pub mod config;
pub mod retrieval;
pub mod storage;
