//! HTTP client wrapper for interacting with Qdrant.

use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::config::Config;
use crate::qdrant::types::{QdrantError, RetrieveResponse, ScrollResponse, StoredPoint};

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantClient {
    /// Client for the Qdrant instance at `url`.
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self, QdrantError> {
        let client = Client::builder()
            .user_agent(concat!("tendermatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = normalize_base_url(url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = api_key.as_deref().is_some_and(|value| !value.is_empty()),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Client configured through `QDRANT_URL` / `QDRANT_API_KEY`.
    pub fn from_config(config: &Config) -> Result<Self, QdrantError> {
        let url = config
            .qdrant_url
            .as_deref()
            .ok_or_else(|| QdrantError::InvalidUrl("QDRANT_URL is not set".into()))?;
        Self::new(url, config.qdrant_api_key.clone())
    }

    /// Create `collection` with a single named cosine vector unless it already exists.
    pub async fn ensure_collection(
        &self,
        collection: &str,
        vector_name: &str,
        vector_size: usize,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection).await? {
            return Ok(());
        }

        tracing::debug!(collection, vector_name, vector_size, "Creating collection");
        let body = json!({
            "vectors": {
                vector_name: { "size": vector_size, "distance": "Cosine" }
            }
        });
        let response = self
            .request(Method::PUT, &format!("collections/{collection}"))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::info!(collection, "Collection created");
        })
        .await
    }

    /// Ensure payload indexes exist; failures other than conflicts are logged, not raised.
    pub async fn ensure_payload_indexes(
        &self,
        collection: &str,
        fields: &[(&str, &str)],
    ) -> Result<(), QdrantError> {
        for &(field, schema) in fields {
            let body = json!({ "field_name": field, "field_schema": schema });
            let response = self
                .request(Method::PUT, &format!("collections/{collection}/index"))
                .query(&[("wait", true)])
                .json(&body)
                .send()
                .await?;

            match response.status() {
                status if status.is_success() => {
                    tracing::debug!(collection, field, schema, "Payload index ensured");
                }
                StatusCode::CONFLICT => {
                    tracing::debug!(collection, field, schema, "Payload index already exists");
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    let error = QdrantError::UnexpectedStatus { status, body };
                    tracing::warn!(collection, field, schema, error = %error, "Failed to ensure payload index");
                }
            }
        }
        Ok(())
    }

    /// Write one point, replacing any point with the same id.
    ///
    /// `vector` may be `None`: named-vector collections accept points without vectors, which
    /// lets a record exist before its embedding.
    pub async fn upsert_point(
        &self,
        collection: &str,
        id: Uuid,
        payload: Value,
        vector: Option<(&str, &[f32])>,
    ) -> Result<(), QdrantError> {
        let mut vectors = Map::new();
        if let Some((name, values)) = vector {
            vectors.insert(name.to_string(), json!(values));
        }
        let body = json!({
            "points": [{ "id": id.to_string(), "vector": vectors, "payload": payload }]
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection}/points"))
            .query(&[("wait", true)])
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection, point_id = %id, "Point upserted");
        })
        .await
    }

    /// Fetch points by id; missing ids are simply absent from the result.
    pub async fn retrieve(
        &self,
        collection: &str,
        ids: &[Uuid],
        with_vector: Option<&str>,
    ) -> Result<Vec<StoredPoint>, QdrantError> {
        let body = json!({
            "ids": ids.iter().map(Uuid::to_string).collect::<Vec<_>>(),
            "with_payload": true,
            "with_vector": vector_selector(with_vector),
        });
        let response = self
            .request(Method::POST, &format!("collections/{collection}/points"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.failure(response, collection, "retrieve").await);
        }
        let RetrieveResponse { result } = response.json().await?;
        Ok(result)
    }

    /// First page of points matching `filter`.
    pub async fn scroll_page(
        &self,
        collection: &str,
        filter: Value,
        limit: usize,
        with_vector: Option<&str>,
    ) -> Result<Vec<StoredPoint>, QdrantError> {
        let body = json!({
            "filter": filter,
            "limit": limit,
            "with_payload": true,
            "with_vector": vector_selector(with_vector),
        });
        let response = self
            .request(Method::POST, &format!("collections/{collection}/points/scroll"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.failure(response, collection, "scroll").await);
        }
        let ScrollResponse { result } = response.json().await?;
        Ok(result.points)
    }

    /// Apply several update operations to `collection` in one request.
    pub async fn batch_update(
        &self,
        collection: &str,
        operations: Vec<Value>,
    ) -> Result<(), QdrantError> {
        let count = operations.len();
        let response = self
            .request(Method::POST, &format!("collections/{collection}/points/batch"))
            .query(&[("wait", true)])
            .json(&json!({ "operations": operations }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection, operations = count, "Batch update applied");
        })
        .await
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(self.failure(response, collection, "collection check").await),
        }
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }

    async fn failure(
        &self,
        response: reqwest::Response,
        collection: &str,
        operation: &'static str,
    ) -> QdrantError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = QdrantError::UnexpectedStatus { status, body };
        tracing::error!(collection, operation, error = %error, "Qdrant request failed");
        error
    }
}

fn vector_selector(name: Option<&str>) -> Value {
    match name {
        Some(name) => json!([name]),
        None => Value::Bool(false),
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

pub(crate) fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Render a point id (string, integer or `{"uuid": ..}`) as text.
pub(crate) fn stringify_point_id(id: &Value) -> String {
    match id {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Object(map) => match map.get("uuid") {
            Some(Value::String(uuid)) => uuid.clone(),
            Some(other) => other.to_string(),
            None => id.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
