//! Abstract persistent store consumed by ingestion and matching.
//!
//! Every method is a single atomic write or read on the backend; callers never rely on
//! multi-call transactions.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{Company, Tender, TenderAttachment};
use crate::qdrant::QdrantError;

mod memory;

pub use memory::MemoryStore;

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Qdrant request failed.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
    /// A stored payload could not be encoded or decoded.
    #[error("Failed to (de)serialize stored record: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The record addressed by an update does not exist.
    #[error("No {kind} with id {id}")]
    MissingRecord {
        /// Record type.
        kind: &'static str,
        /// Requested identity.
        id: Uuid,
    },
}

/// Tender, company and attachment persistence.
#[async_trait]
pub trait TenderStore: Send + Sync {
    /// Tender carrying `external_id`, if any.
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Tender>, StoreError>;

    /// Tender by identity.
    async fn get_tender(&self, id: Uuid) -> Result<Option<Tender>, StoreError>;

    /// Insert or replace the tender stored under `tender.id`.
    async fn upsert(&self, tender: Tender) -> Result<Tender, StoreError>;

    /// Attach the requirement embedding and mark the tender `ready` in one write.
    async fn update_embedding(&self, id: Uuid, embedding: Vec<f32>) -> Result<(), StoreError>;

    /// Company profile owned by `owner_id`, including its embedding.
    async fn find_company_by_owner(&self, owner_id: Uuid) -> Result<Option<Company>, StoreError>;

    /// Insert or replace the company stored under `company.id`.
    async fn upsert_company(&self, company: Company) -> Result<Company, StoreError>;

    /// Tenders whose deadline lies after `now`, returned with their embeddings.
    ///
    /// Scoring happens in the matching engine; backends only apply the deadline filter.
    async fn query_candidate_tenders(
        &self,
        company: &Company,
        now: OffsetDateTime,
    ) -> Result<Vec<Tender>, StoreError>;

    /// Store a new attachment record.
    async fn insert_attachment(&self, attachment: TenderAttachment) -> Result<(), StoreError>;

    /// Attachment by identity.
    async fn get_attachment(&self, id: Uuid) -> Result<Option<TenderAttachment>, StoreError>;

    /// Write the OCR result of an attachment and flag it processed.
    async fn record_attachment_ocr(
        &self,
        id: Uuid,
        content: String,
        embedding: Option<Vec<f32>>,
    ) -> Result<(), StoreError>;
}
