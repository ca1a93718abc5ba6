//! Error types for the embedding system

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type covering every embedding failure mode.
///
/// Backends surface two classes of runtime failure: the backend is
/// unreachable ([`EmbedError::Http`]) or it rejected the input
/// ([`EmbedError::Rejected`]). Everything else is configuration or
/// initialization trouble. Callers must propagate these: silently
/// substituting zero vectors would poison the vector store.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when the provider configuration is invalid or incomplete
    #[error("Invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// Error while establishing the backend or loading a local model
    #[error("Backend initialization failed: {source}")]
    Initialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error during embedding generation
    #[error("Embedding generation failed: {source}")]
    Generation {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// HTTP transport failure: the backend is unreachable
    #[error("Embedding backend unreachable: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// The backend answered but rejected the request
    #[error("Embedding backend rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    /// IO errors when reading local model files
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Async task join errors
    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Generic errors from other libraries
    #[error("External error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Create an initialization error from any error type.
    pub fn initialization<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Initialization {
            source: Box::new(source),
        }
    }

    /// Create an embedding generation error from any error type.
    pub fn generation<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Generation {
            source: Box::new(source),
        }
    }

    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
