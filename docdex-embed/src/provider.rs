//! Embedding provider trait, local backend, and construction-time factory
//!
//! The indexing pipeline depends only on the [`EmbeddingProvider`] contract:
//! text in, fixed-dimension vector out, dimension known after construction.
//! Backends are resolved exactly once, by [`create_provider`], from the
//! configured [`ProviderKind`]; nothing downstream inspects which backend
//! it is talking to.
//!
//! Every provider discovers its output dimension at construction by
//! embedding a sentinel string, so the declared dimension always reflects
//! what the backend actually produces.

use crate::config::{EmbedConfig, ProviderKind};
use crate::error::{EmbedError, Result};
use crate::http::{OllamaProvider, OpenAiProvider};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

/// Sentinel text embedded once at initialization to discover the backend's
/// vector dimension.
pub const DIMENSION_PROBE: &str = "dimension probe";

/// Capability contract for generating text embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, order-preserving: the result
    /// has the same length as `texts` and `result[i]` embeds `texts[i]`.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The fixed dimension of every vector this provider produces.
    fn dimension(&self) -> usize;

    /// Identifier of this provider, for logs and diagnostics.
    fn provider_name(&self) -> &str;
}

/// Construct the provider selected by `config`, fully initialized.
///
/// This is the only place backend selection happens; the returned trait
/// object has already probed its dimension and is ready to embed.
pub async fn create_provider(config: &EmbedConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        ProviderKind::FastEmbed => Ok(Arc::new(FastEmbedProvider::create(config.clone()).await?)),
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::create(config.clone()).await?)),
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::create(config.clone()).await?)),
    }
}

/// Local embedding backend running ONNX models via fastembed.
///
/// Model inference is CPU-bound and synchronous, so every call runs inside
/// `spawn_blocking` with the model behind a mutex.
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model", &self.config.model_name())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Load the configured model and probe its dimension.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let model_name = config.model_name().to_string();
        tracing::info!("Loading local embedding model: {model_name}");

        let embedding_model = Self::resolve_model(&model_name)?;

        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                let init_options = InitOptions::new(embedding_model);
                let mut model = TextEmbedding::try_new(init_options)
                    .map_err(|e| EmbedError::External { source: e })?;

                let probe = model
                    .embed(vec![DIMENSION_PROBE.to_string()], None)
                    .map_err(|e| EmbedError::External { source: e })?;
                let dimension = match probe.first() {
                    Some(embedding) if !embedding.is_empty() => embedding.len(),
                    _ => {
                        return Err(EmbedError::invalid_config(
                            "model produced no embedding for the dimension probe",
                        ));
                    }
                };

                Ok((model, dimension))
            })
            .await??;

        tracing::info!("Loaded embedding model {model_name} (dim={dimension})");
        Ok(Self {
            config,
            model: Arc::new(Mutex::new(model)),
            dimension,
        })
    }

    fn resolve_model(name: &str) -> Result<EmbeddingModel> {
        match name {
            "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            other => Err(EmbedError::invalid_config(format!(
                "unknown fastembed model: {other}"
            ))),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = vec![text.to_string()];
        let mut embeddings = self.embed_batch(&texts).await?;
        embeddings
            .pop()
            .ok_or_else(|| EmbedError::invalid_config("no embedding generated for text"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let batch = batch.to_vec();
            let model = Arc::clone(&self.model);

            let batch_embeddings =
                tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                    let mut model_guard = model.lock().unwrap();
                    model_guard
                        .embed(batch, None)
                        .map_err(|e| EmbedError::External { source: e })
                })
                .await??;

            all_embeddings.extend(batch_embeddings);
        }

        Ok(all_embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}
