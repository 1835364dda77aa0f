//! HTTP surface for tender ingestion and matching.
//!
//! A thin Axum router over [`TenderApi`]:
//!
//! - `GET /health` – Liveness probe.
//! - `POST /ingest` – Multipart upload (`file`) of an eForms notice (`.xml`) or a scanned tender
//!   (`.pdf`); returns the stored tender.
//! - `GET /feed?limit=` – Ranked matches for the caller's company.
//! - `POST /tenders/:id/attachments` – Multipart attachment upload (`file`, optional `title`,
//!   `document_type`, `description`); PDFs are transcribed in the background.
//! - `GET /attachments/:id` – Attachment record; poll `ocr_processed`.
//! - `PUT /companies` – Create or replace the caller's company profile.
//! - `POST /analyze/:tender_id` – Compliance verdict for the caller's company.
//! - `GET /metrics` – Ingestion and matching counters.
//!
//! Authentication is out of scope; the caller identifies itself with the `x-owner-id` header.

use crate::app::{ApiError, ErrorKind, TenderApi};
use crate::company::CompanyInput;
use crate::ingestion::AttachmentUpload;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Header carrying the caller's account id.
pub const OWNER_HEADER: &str = "x-owner-id";

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Build the HTTP router over `service`.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: TenderApi + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/ingest", post(ingest::<S>))
        .route("/feed", get(feed::<S>))
        .route("/tenders/:id/attachments", post(upload_attachment::<S>))
        .route("/attachments/:id", get(get_attachment::<S>))
        .route("/companies", put(upsert_company::<S>))
        .route("/analyze/:tender_id", post(analyze::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Accept one uploaded document and run it through ingestion.
async fn ingest<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Response, AppError>
where
    S: TenderApi,
{
    let upload = read_upload(multipart).await?;
    let tender = service.process_upload(upload.bytes, &upload.filename).await?;
    tracing::info!(tender_id = %tender.id, filename = %upload.filename, "Upload ingested");
    Ok((StatusCode::CREATED, Json(tender)).into_response())
}

#[derive(Deserialize)]
struct FeedQuery {
    #[serde(default)]
    limit: Option<i64>,
}

async fn feed<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Query(query): Query<FeedQuery>,
) -> Result<Response, AppError>
where
    S: TenderApi,
{
    let owner_id = owner_id(&headers)?;
    let matches = service.find_matches(owner_id, query.limit).await?;
    Ok(Json(json!({ "matches": matches })).into_response())
}

async fn upload_attachment<S>(
    State(service): State<Arc<S>>,
    Path(tender_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Response, AppError>
where
    S: TenderApi,
{
    let upload = read_upload(multipart).await?;
    let attachment = service.upload_attachment(tender_id, upload).await?;
    Ok((StatusCode::ACCEPTED, Json(attachment)).into_response())
}

async fn get_attachment<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError>
where
    S: TenderApi,
{
    Ok(Json(service.get_attachment(id).await?).into_response())
}

async fn upsert_company<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Json(input): Json<CompanyInput>,
) -> Result<Response, AppError>
where
    S: TenderApi,
{
    let owner_id = owner_id(&headers)?;
    Ok(Json(service.upsert_company(owner_id, input).await?).into_response())
}

async fn analyze<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Path(tender_id): Path<Uuid>,
) -> Result<Response, AppError>
where
    S: TenderApi,
{
    let owner_id = owner_id(&headers)?;
    Ok(Json(service.check_compliance(owner_id, tender_id).await?).into_response())
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Response
where
    S: TenderApi,
{
    Json(service.metrics_snapshot()).into_response()
}

fn owner_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let value = headers
        .get(OWNER_HEADER)
        .ok_or_else(|| AppError::BadRequest(format!("Missing {OWNER_HEADER} header")))?;
    value
        .to_str()
        .ok()
        .and_then(|text| Uuid::parse_str(text.trim()).ok())
        .ok_or_else(|| AppError::BadRequest(format!("{OWNER_HEADER} must be a UUID")))
}

/// Collect the `file` part and optional text fields of a multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<AttachmentUpload, AppError> {
    let mut upload = AttachmentUpload::default();
    let mut has_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(err.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                upload.filename = field.file_name().unwrap_or_default().to_string();
                upload.bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::BadRequest(err.body_text()))?
                    .to_vec();
                has_file = true;
            }
            "title" | "document_type" | "description" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::BadRequest(err.body_text()))?;
                let slot = match name.as_str() {
                    "title" => &mut upload.title,
                    "document_type" => &mut upload.document_type,
                    _ => &mut upload.description,
                };
                *slot = Some(text);
            }
            _ => {}
        }
    }

    if !has_file {
        return Err(AppError::BadRequest("Missing multipart field `file`".into()));
    }
    Ok(upload)
}

enum AppError {
    Api(ApiError),
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Api(err) => {
                let status = match err.kind() {
                    ErrorKind::Validation | ErrorKind::Parse => StatusCode::BAD_REQUEST,
                    ErrorKind::ExternalService => StatusCode::BAD_GATEWAY,
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    tracing::error!(error = %err, "Request failed");
                }
                (status, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(inner: ApiError) -> Self {
        Self::Api(inner)
    }
}
