//! Vision-model transcription over an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::OcrError;
use crate::config::Config;
use crate::openrouter::{Attribution, build_client, endpoint};

/// Instruction sent with every page image.
pub const OCR_PROMPT: &str = "Convert the document to markdown. Extract all text accurately.";

const MAX_TOKENS: u32 = 4096;

/// Transcribes one page image into text.
#[async_trait]
pub trait VisionExtractor: Send + Sync {
    /// Return the markdown transcription of a PNG page image.
    async fn extract(&self, png: &[u8]) -> Result<String, OcrError>;
}

/// [`VisionExtractor`] calling `POST {base}/chat/completions` with an inline data-URI image.
pub struct ChatVisionExtractor {
    client: Client,
    endpoint: String,
    model: String,
}

impl ChatVisionExtractor {
    /// Build an extractor; `timeout` bounds each page call.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<&str>,
        timeout: Duration,
        attribution: &Attribution,
    ) -> Result<Self, OcrError> {
        let client = build_client(timeout, api_key, attribution)
            .map_err(|err| OcrError::Extraction(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint(base_url, "chat/completions"),
            model: model.into(),
        })
    }

    /// Build an extractor from the `OCR_*` settings.
    pub fn from_config(config: &Config) -> Result<Self, OcrError> {
        Self::new(
            &config.ocr_base_url,
            config.ocr_model.clone(),
            config.ocr_api_key.as_deref(),
            Duration::from_secs(config.ocr_timeout_secs),
            &Attribution::from_config(config),
        )
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl VisionExtractor for ChatVisionExtractor {
    async fn extract(&self, png: &[u8]) -> Result<String, OcrError> {
        let data_uri = format!("data:image/png;base64,{}", BASE64.encode(png));
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": OCR_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_uri } }
                ]
            }],
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| OcrError::Extraction(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Extraction(format!("status {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| OcrError::Extraction(format!("invalid response: {err}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| OcrError::Extraction("response contained no choices".into()))
    }
}
