use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{EmbeddingClient, EmbeddingError};
use crate::config::Config;
use crate::openrouter::{Attribution, build_client, endpoint};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Embeddings over any OpenAI-compatible `/embeddings` endpoint (OpenAI, OpenRouter, ...).
///
/// No retries: transport and status failures surface as [`EmbeddingError::Unavailable`].
#[derive(Clone)]
pub struct OpenAiEmbeddingClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiEmbeddingClient {
    /// Build a client for `model` at `base_url`.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<&str>,
        attribution: &Attribution,
    ) -> Result<Self, EmbeddingError> {
        let client = build_client(REQUEST_TIMEOUT, api_key, attribution)
            .map_err(|err| EmbeddingError::Unavailable(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint(base_url, "embeddings"),
            model: model.into(),
        })
    }

    /// Build from the `EMBEDDING_*` settings.
    pub fn from_config(config: &Config) -> Result<Self, EmbeddingError> {
        Self::new(
            &config.embedding_base_url,
            config.embedding_model.clone(),
            config.embedding_api_key.as_deref(),
            &Attribution::from_config(config),
        )
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(model = %self.model, inputs = texts.len(), "Requesting embeddings");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: &texts,
            })
            .send()
            .await
            .map_err(|err| EmbeddingError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Embedding request failed");
            return Err(EmbeddingError::Unavailable(format!("status {status}: {body}")));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| EmbeddingError::Unavailable(format!("invalid response: {err}")))?;
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() < texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                returned: parsed.data.len(),
            });
        }

        Ok(parsed
            .data
            .into_iter()
            .take(texts.len())
            .map(|entry| entry.embedding)
            .collect())
    }
}
