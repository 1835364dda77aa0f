use async_trait::async_trait;

use super::{EmbeddingClient, EmbeddingError};

/// Deterministic offline embedding client.
///
/// Bytes are folded into `dimension` slots and the result is L2-normalized, so equal texts
/// always produce equal vectors. Used for local runs and tests; it carries no semantics.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbeddingClient {
    dimension: usize,
}

impl HashingEmbeddingClient {
    /// Client producing vectors of length `dimension`.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];
        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            embedding[idx % self.dimension] += f32::from(byte) / 255.0;
        }

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|v| *v /= norm);
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.dimension == 0 {
            return Err(EmbeddingError::Unavailable(
                "embedding dimension must be greater than zero".into(),
            ));
        }
        tracing::debug!(inputs = texts.len(), dimension = self.dimension, "Hashing embeddings");
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }
}
