//! Caller-facing operations and their production wiring.
//!
//! [`TenderApi`] is the seam the HTTP router and the CLI are written against; [`App`] implements
//! it over the configured store and collaborators.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::company::{CompanyError, CompanyInput, CompanyService};
use crate::compliance::{ChatComplianceAgent, ComplianceAgent, ComplianceError, ComplianceService};
use crate::config::{Config, StoreBackend};
use crate::domain::{Company, ComplianceCheck, Match, Tender, TenderAttachment};
use crate::embedding::{EmbeddingClient, get_embedding_client};
use crate::geocoding::{Geocoder, get_geocoder};
use crate::ingestion::{AttachmentOcrHandler, AttachmentUpload, IngestionError, IngestionService};
use crate::matching::{MatchError, MatchingService};
use crate::metrics::{IngestionMetrics, MetricsSnapshot};
use crate::ocr::worker::OcrWorkerPool;
use crate::ocr::{ChatVisionExtractor, OcrPipeline, PdfiumRenderer};
use crate::qdrant::{Collections, QdrantClient, QdrantStore};
use crate::store::{MemoryStore, TenderStore};

/// Failure categories reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected input: unsupported file type or notice type.
    Validation,
    /// Malformed document.
    Parse,
    /// Embedding, OCR, geocoding or agent failure.
    ExternalService,
    /// Missing company, tender or attachment.
    NotFound,
    /// Store read or write failure.
    Persistence,
}

/// Error returned by [`TenderApi`] operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Upload or attachment failure.
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    /// Match query failure.
    #[error(transparent)]
    Matching(#[from] MatchError),
    /// Company profile failure.
    #[error(transparent)]
    Company(#[from] CompanyError),
    /// Compliance check failure.
    #[error(transparent)]
    Compliance(#[from] ComplianceError),
}

impl ApiError {
    /// Category of the wrapped error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Ingestion(err) => err.kind(),
            Self::Matching(err) => err.kind(),
            Self::Company(err) => err.kind(),
            Self::Compliance(err) => err.kind(),
        }
    }
}

/// Operations exposed to callers.
#[async_trait]
pub trait TenderApi: Send + Sync {
    /// Ingest an uploaded notice (`.xml`) or scan (`.pdf`).
    async fn process_upload(&self, bytes: Vec<u8>, filename: &str) -> Result<Tender, ApiError>;

    /// Store an attachment for a tender; PDFs are transcribed in the background.
    async fn upload_attachment(
        &self,
        tender_id: Uuid,
        upload: AttachmentUpload,
    ) -> Result<TenderAttachment, ApiError>;

    /// Attachment by identity.
    async fn get_attachment(&self, id: Uuid) -> Result<TenderAttachment, ApiError>;

    /// Ranked matches for the company owned by `owner_id`.
    async fn find_matches(&self, owner_id: Uuid, limit: Option<i64>)
    -> Result<Vec<Match>, ApiError>;

    /// Create or replace the company profile of `owner_id`.
    async fn upsert_company(&self, owner_id: Uuid, input: CompanyInput)
    -> Result<Company, ApiError>;

    /// Feasibility verdict for one tender.
    async fn check_compliance(
        &self,
        owner_id: Uuid,
        tender_id: Uuid,
    ) -> Result<ComplianceCheck, ApiError>;

    /// Current counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// External collaborators the services are built from.
pub struct Collaborators {
    /// Persistent store.
    pub store: Arc<dyn TenderStore>,
    /// Embedding service.
    pub embedder: Arc<dyn EmbeddingClient>,
    /// Address lookup.
    pub geocoder: Arc<dyn Geocoder>,
    /// Scan transcription.
    pub ocr: Arc<OcrPipeline>,
    /// Compliance agent.
    pub agent: Arc<dyn ComplianceAgent>,
}

/// Sizing of the services.
#[derive(Debug, Clone, Copy)]
pub struct AppOptions {
    /// Expected embedding length.
    pub dimension: usize,
    /// Concurrent background OCR jobs.
    pub ocr_workers: usize,
    /// Pending background OCR jobs.
    pub ocr_queue_capacity: usize,
}

/// Production implementation of [`TenderApi`].
pub struct App {
    ingestion: IngestionService,
    matching: MatchingService,
    companies: CompanyService,
    compliance: ComplianceService,
    metrics: Arc<IngestionMetrics>,
}

impl App {
    /// Wire the services over `collaborators`; spawns the background OCR pool.
    pub fn new(collaborators: Collaborators, options: AppOptions) -> Self {
        let Collaborators {
            store,
            embedder,
            geocoder,
            ocr,
            agent,
        } = collaborators;
        let metrics = Arc::new(IngestionMetrics::new());

        let handler = AttachmentOcrHandler::new(
            Arc::clone(&store),
            Arc::clone(&ocr),
            Arc::clone(&embedder),
            options.dimension,
        );
        let ocr_jobs = OcrWorkerPool::spawn(
            Arc::new(handler),
            options.ocr_workers,
            options.ocr_queue_capacity,
        );

        Self {
            ingestion: IngestionService::new(
                Arc::clone(&store),
                Arc::clone(&embedder),
                Arc::clone(&geocoder),
                ocr,
                ocr_jobs,
                Arc::clone(&metrics),
                options.dimension,
            ),
            matching: MatchingService::new(Arc::clone(&store), Arc::clone(&metrics)),
            companies: CompanyService::new(
                Arc::clone(&store),
                embedder,
                geocoder,
                options.dimension,
            ),
            compliance: ComplianceService::new(store, agent),
            metrics,
        }
    }

    /// Build every collaborator from `config`, creating Qdrant collections when needed.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn TenderStore> = match config.store_backend {
            StoreBackend::Qdrant => {
                let client = QdrantClient::from_config(config).context("Qdrant client")?;
                let store = QdrantStore::new(client, Collections::from_config(config));
                store
                    .ensure_schema(config.embedding_dimension)
                    .await
                    .context("creating Qdrant collections")?;
                Arc::new(store)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; records are lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let extractor = ChatVisionExtractor::from_config(config).context("vision extractor")?;
        let ocr = OcrPipeline::new(Arc::new(PdfiumRenderer::new()), Arc::new(extractor))
            .with_dpi(config.ocr_render_dpi);

        let collaborators = Collaborators {
            store,
            embedder: get_embedding_client(config).context("embedding client")?,
            geocoder: get_geocoder(config).context("geocoder")?,
            ocr: Arc::new(ocr),
            agent: Arc::new(ChatComplianceAgent::from_config(config).context("compliance agent")?),
        };
        tracing::info!(
            backend = ?config.store_backend,
            dimension = config.embedding_dimension,
            ocr_workers = config.ocr_workers,
            ocr_timeout = ?Duration::from_secs(config.ocr_timeout_secs),
            "Services ready"
        );
        Ok(Self::new(
            collaborators,
            AppOptions {
                dimension: config.embedding_dimension,
                ocr_workers: config.ocr_workers,
                ocr_queue_capacity: config.ocr_queue_capacity,
            },
        ))
    }
}

#[async_trait]
impl TenderApi for App {
    async fn process_upload(&self, bytes: Vec<u8>, filename: &str) -> Result<Tender, ApiError> {
        Ok(self.ingestion.process_upload(bytes, filename).await?)
    }

    async fn upload_attachment(
        &self,
        tender_id: Uuid,
        upload: AttachmentUpload,
    ) -> Result<TenderAttachment, ApiError> {
        Ok(self.ingestion.upload_attachment(tender_id, upload).await?)
    }

    async fn get_attachment(&self, id: Uuid) -> Result<TenderAttachment, ApiError> {
        Ok(self.ingestion.get_attachment(id).await?)
    }

    async fn find_matches(
        &self,
        owner_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Match>, ApiError> {
        Ok(self.matching.find_matches(owner_id, limit).await?)
    }

    async fn upsert_company(
        &self,
        owner_id: Uuid,
        input: CompanyInput,
    ) -> Result<Company, ApiError> {
        Ok(self.companies.upsert_company(owner_id, input).await?)
    }

    async fn check_compliance(
        &self,
        owner_id: Uuid,
        tender_id: Uuid,
    ) -> Result<ComplianceCheck, ApiError> {
        Ok(self.compliance.check_compliance(owner_id, tender_id).await?)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeError;
    use crate::ocr::OcrError;

    #[test]
    fn kinds_follow_wrapped_errors() {
        let unsupported: ApiError = IngestionError::UnsupportedFormat {
            extension: "docx".into(),
        }
        .into();
        assert_eq!(unsupported.kind(), ErrorKind::Validation);

        let empty: ApiError = IngestionError::Ocr(OcrError::EmptyDocument).into();
        assert_eq!(empty.kind(), ErrorKind::Validation);

        let award: ApiError = IngestionError::Notice(NoticeError::UnsupportedNoticeType {
            root: "ContractAwardNotice".into(),
            reason: "award notices announce finished procedures",
        })
        .into();
        assert_eq!(award.kind(), ErrorKind::Validation);

        let missing: ApiError = MatchError::CompanyNotFound(Uuid::nil()).into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert!(missing.to_string().contains("No company profile"));

        let agent: ApiError = ComplianceError::Agent("timeout".into()).into();
        assert_eq!(agent.kind(), ErrorKind::ExternalService);
    }

    #[tokio::test]
    async fn memory_backend_wires_without_network() {
        let mut config = crate::config::test_config();
        config.store_backend = StoreBackend::Memory;
        let app = App::from_config(&config).await.expect("app");
        assert_eq!(app.metrics_snapshot(), MetricsSnapshot::default());
    }
}
