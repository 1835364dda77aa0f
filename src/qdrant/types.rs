//! Shared types used by the Qdrant client and helpers.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Named vector slots; each collection declares exactly one.
pub const REQUIREMENT_VECTOR: &str = "requirement";
/// Company profile vector slot.
pub const PROFILE_VECTOR: &str = "profile";
/// Attachment content vector slot.
pub const CONTENT_VECTOR: &str = "content";

/// Point returned by retrieve and scroll calls.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredPoint {
    /// Point identifier as sent by Qdrant.
    #[serde(default)]
    pub id: Option<Value>,
    /// Payload when requested.
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
    /// Named vectors when requested.
    #[serde(default)]
    pub vector: Option<Value>,
}

impl StoredPoint {
    /// The named vector `name`, when present and numeric.
    pub fn named_vector(&self, name: &str) -> Option<Vec<f32>> {
        let raw = self.vector.as_ref()?.get(name)?;
        serde_json::from_value(raw.clone()).ok()
    }
}

#[derive(Deserialize)]
pub(crate) struct RetrieveResponse {
    #[serde(default)]
    pub(crate) result: Vec<StoredPoint>,
}

#[derive(Deserialize)]
pub(crate) struct ScrollResponse {
    pub(crate) result: ScrollResult,
}

#[derive(Deserialize)]
pub(crate) struct ScrollResult {
    #[serde(default)]
    pub(crate) points: Vec<StoredPoint>,
    #[serde(default)]
    pub(crate) next_page_offset: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn named_vector_reads_only_the_requested_slot() {
        let point: StoredPoint = serde_json::from_value(json!({
            "id": "8d1c",
            "payload": { "title": "Kanal" },
            "vector": { "requirement": [0.25, 0.5] }
        }))
        .expect("point");

        assert_eq!(point.named_vector(REQUIREMENT_VECTOR), Some(vec![0.25, 0.5]));
        assert_eq!(point.named_vector(PROFILE_VECTOR), None);

        let bare: StoredPoint = serde_json::from_value(json!({ "id": 7 })).expect("point");
        assert_eq!(bare.named_vector(REQUIREMENT_VECTOR), None);
    }
}
