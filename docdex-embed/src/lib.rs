//! # docdex-embed
//!
//! Embedding capability abstraction for the docdex retrieval engine. The
//! indexing pipeline depends only on the [`EmbeddingProvider`] contract
//! (text in, fixed-dimension vector out), so backends are interchangeable at
//! configuration time:
//!
//! - **fastembed**: local ONNX models, no network
//! - **Ollama**: a remote model server over HTTP
//! - **OpenAI**: the cloud embeddings API (or a compatible endpoint)
//!
//! ## Quick Start
//!
//! ```no_run
//! use docdex_embed::{EmbedConfig, create_provider};
//!
//! # async fn example() -> docdex_embed::Result<()> {
//! let provider = create_provider(&EmbedConfig::ollama("http://localhost:11434")).await?;
//! let vector = provider.embed("What is the USSD code?").await?;
//! assert_eq!(vector.len(), provider.dimension());
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure semantics
//!
//! Every backend failure propagates as a typed [`EmbedError`]; callers must
//! not substitute zero vectors. Construction probes the backend with a
//! sentinel string, so a provider that exists is a provider whose dimension
//! is known and whose backend is reachable.

pub mod config;
pub mod error;
pub mod http;
pub mod provider;

pub use config::{EmbedConfig, EmbedConfigBuilder, ProviderKind};
pub use error::{EmbedError, Result};
pub use http::{OllamaProvider, OpenAiProvider};
pub use provider::{DIMENSION_PROBE, EmbeddingProvider, FastEmbedProvider, create_provider};
