//! HTTP embedding backends: Ollama and the OpenAI embeddings API
//!
//! Both backends speak simple JSON over HTTP and discover their vector
//! dimension by embedding [`DIMENSION_PROBE`](crate::provider::DIMENSION_PROBE)
//! once at construction. Transport failures surface as
//! [`EmbedError::Http`]; non-success status codes as
//! [`EmbedError::Rejected`] with the response body attached.

use crate::config::{DEFAULT_OLLAMA_URL, EmbedConfig};
use crate::error::{EmbedError, Result};
use crate::provider::{DIMENSION_PROBE, EmbeddingProvider};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

/// Embedding backend talking to an Ollama server.
///
/// Ollama exposes no batch endpoint, so batch embedding issues one request
/// per text, sequentially, preserving input order.
#[derive(Debug)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaProvider {
    /// Connect to the configured Ollama server and probe the model dimension.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let mut provider = Self {
            client,
            base_url: config.endpoint(DEFAULT_OLLAMA_URL),
            model: config.model_name().to_string(),
            dimension: 0,
        };
        provider.initialize().await?;
        Ok(provider)
    }

    /// Probe the backend once; repeated calls are no-ops.
    async fn initialize(&mut self) -> Result<()> {
        if self.dimension != 0 {
            return Ok(());
        }
        let probe = self.request_embedding(DIMENSION_PROBE).await?;
        if probe.is_empty() {
            return Err(EmbedError::invalid_config(format!(
                "Ollama model {} returned an empty embedding",
                self.model
            )));
        }
        self.dimension = probe.len();
        tracing::info!(
            "Connected to Ollama embedding model {} at {} (dim={})",
            self.model,
            self.base_url,
            self.dimension
        );
        Ok(())
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&serde_json::json!({ "model": self.model, "prompt": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmbedError::Rejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json::<OllamaEmbeddingResponse>().await?.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_embedding(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.request_embedding(text).await?);
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}

/// Embedding backend for the OpenAI embeddings API or a compatible endpoint.
#[derive(Debug)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingItem>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    /// Read the API key from the configured environment variable, then probe
    /// the model dimension.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            EmbedError::invalid_config(format!(
                "missing API key: environment variable {} is not set",
                config.api_key_env
            ))
        })?;

        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let mut provider = Self {
            client,
            base_url: config.endpoint(DEFAULT_OPENAI_URL),
            api_key,
            model: config.model_name().to_string(),
            dimension: 0,
        };
        provider.initialize().await?;
        Ok(provider)
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.dimension != 0 {
            return Ok(());
        }
        let probe = self
            .request_embeddings(&[DIMENSION_PROBE.to_string()])
            .await?;
        let dimension = probe.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(EmbedError::invalid_config(format!(
                "OpenAI model {} returned an empty embedding",
                self.model
            )));
        }
        self.dimension = dimension;
        tracing::info!(
            "Using OpenAI embedding model {} (dim={})",
            self.model,
            self.dimension
        );
        Ok(())
    }

    async fn request_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "model": self.model, "input": texts }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmbedError::Rejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let mut data = response.json::<OpenAiEmbeddingResponse>().await?.data;
        // The API tags each embedding with its input index; sort so the
        // output order always matches the input order.
        data.sort_by_key(|item| item.index);
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.request_embeddings(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| EmbedError::invalid_config("no embedding generated for text"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request_embeddings(texts).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    #[tokio::test]
    async fn test_openai_requires_api_key() {
        let config = EmbedConfig::builder()
            .provider(ProviderKind::OpenAi)
            .api_key_env("DOCDEX_TEST_MISSING_KEY".to_string())
            .build()
            .expect("valid config");

        let err = OpenAiProvider::create(config).await.unwrap_err();
        assert!(matches!(err, EmbedError::InvalidConfig { .. }));
    }

    #[test]
    fn test_openai_response_order_restored() {
        let mut data = vec![
            OpenAiEmbeddingItem {
                index: 1,
                embedding: vec![1.0],
            },
            OpenAiEmbeddingItem {
                index: 0,
                embedding: vec![0.0],
            },
        ];
        data.sort_by_key(|item| item.index);
        assert_eq!(data[0].embedding, vec![0.0]);
        assert_eq!(data[1].embedding, vec![1.0]);
    }
}
