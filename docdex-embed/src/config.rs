//! Configuration for embedding providers

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default base URL for the Ollama backend.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
/// Default model per backend when none is configured.
pub const DEFAULT_FASTEMBED_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text:latest";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-ada-002";

/// Which embedding backend to construct.
///
/// The pipeline never branches on this after construction: the factory in
/// [`crate::provider`] resolves it once into a concrete provider behind the
/// [`crate::EmbeddingProvider`] trait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Local ONNX model via fastembed, no network required.
    #[default]
    FastEmbed,
    /// Remote Ollama server over HTTP.
    Ollama,
    /// OpenAI embeddings API (or a compatible endpoint).
    OpenAi,
}

/// Configuration for embedding providers.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
#[serde(default)]
pub struct EmbedConfig {
    /// Backend to use.
    #[builder(default)]
    pub provider: ProviderKind,
    /// Model identifier understood by the selected backend. `None` selects
    /// the backend's default model.
    #[builder(default)]
    pub model: Option<String>,
    /// Base URL for HTTP backends. `None` selects the backend's default
    /// endpoint.
    #[builder(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key for cloud backends.
    #[builder(default = "String::from(\"OPENAI_API_KEY\")")]
    pub api_key_env: String,
    /// Maximum number of texts per batch for the local backend.
    #[builder(default = "32")]
    pub batch_size: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            base_url: None,
            api_key_env: String::from("OPENAI_API_KEY"),
            batch_size: 32,
        }
    }
}

impl EmbedConfig {
    /// Create a new embedding configuration using the builder.
    pub fn builder() -> EmbedConfigBuilder {
        EmbedConfigBuilder::default()
    }

    /// Configuration for the local fastembed backend with its default model.
    pub fn fastembed() -> Self {
        Self::default()
    }

    /// Configuration for an Ollama server at `base_url`.
    pub fn ollama<S: Into<String>>(base_url: S) -> Self {
        Self {
            provider: ProviderKind::Ollama,
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// Configuration for the OpenAI embeddings API.
    pub fn openai() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            ..Self::default()
        }
    }

    /// The effective model name, falling back to the backend default.
    pub fn model_name(&self) -> &str {
        match &self.model {
            Some(model) => model.as_str(),
            None => match self.provider {
                ProviderKind::FastEmbed => DEFAULT_FASTEMBED_MODEL,
                ProviderKind::Ollama => DEFAULT_OLLAMA_MODEL,
                ProviderKind::OpenAi => DEFAULT_OPENAI_MODEL,
            },
        }
    }

    /// The effective base URL for HTTP backends.
    pub fn endpoint(&self, default: &str) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbedConfig::default();
        assert_eq!(config.provider, ProviderKind::FastEmbed);
        assert_eq!(config.model_name(), DEFAULT_FASTEMBED_MODEL);
        assert_eq!(config.batch_size, 32);
    }

    #[test]
    fn test_backend_defaults() {
        let ollama = EmbedConfig::ollama("http://embedder:11434");
        assert_eq!(ollama.provider, ProviderKind::Ollama);
        assert_eq!(ollama.model_name(), DEFAULT_OLLAMA_MODEL);
        assert_eq!(ollama.endpoint(DEFAULT_OLLAMA_URL), "http://embedder:11434");

        let openai = EmbedConfig::openai();
        assert_eq!(openai.model_name(), DEFAULT_OPENAI_MODEL);
        assert_eq!(openai.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_builder_overrides_model() {
        let config = EmbedConfig::builder()
            .provider(ProviderKind::Ollama)
            .model(Some("mxbai-embed-large".to_string()))
            .build()
            .expect("valid config");
        assert_eq!(config.model_name(), "mxbai-embed-large");
    }

    #[test]
    fn test_deserialize_from_toml_fragment() {
        let config: EmbedConfig = serde_json::from_value(serde_json::json!({
            "provider": "ollama",
            "base_url": "http://localhost:11434"
        }))
        .expect("deserializes");
        assert_eq!(config.provider, ProviderKind::Ollama);
        assert_eq!(config.batch_size, 32);
    }
}
