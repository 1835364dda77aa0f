use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, EmbeddingProvider};

mod hashing;
mod openai;

pub use hashing::HashingEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Provider was unreachable or refused the request.
    #[error("Embedding service unavailable: {0}")]
    Unavailable(String),
    /// Provider returned fewer vectors than inputs.
    #[error("Embedding service returned {returned} vectors for {expected} inputs")]
    CountMismatch {
        /// Number of inputs sent.
        expected: usize,
        /// Number of vectors received.
        returned: usize,
    },
    /// A vector does not match the configured collection dimensionality.
    #[error("Embedding has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        /// Configured dimensionality.
        expected: usize,
        /// Length of the received vector.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one vector per input text, in input order.
    async fn generate_embeddings(&self, texts: Vec<String>)
    -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Embed a single text and check its length against `dimension`.
pub async fn embed_one(
    client: &dyn EmbeddingClient,
    text: String,
    dimension: usize,
) -> Result<Vec<f32>, EmbeddingError> {
    let vector = client
        .generate_embeddings(vec![text])
        .await?
        .into_iter()
        .next()
        .ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            returned: 0,
        })?;
    if vector.len() != dimension {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    Ok(vector)
}

/// Build the embedding client selected by `EMBEDDING_PROVIDER`.
pub fn get_embedding_client(
    config: &Config,
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingError> {
    match config.embedding_provider {
        EmbeddingProvider::OpenAI => Ok(Arc::new(OpenAiEmbeddingClient::from_config(config)?)),
        EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbeddingClient::new(
            config.embedding_dimension,
        ))),
    }
}
