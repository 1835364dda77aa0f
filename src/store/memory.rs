use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, TenderStore};
use crate::domain::{Company, ProcessingStatus, Tender, TenderAttachment};

/// Process-local store for tests, the CLI and `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    tenders: RwLock<HashMap<Uuid, Tender>>,
    companies: RwLock<HashMap<Uuid, Company>>,
    attachments: RwLock<HashMap<Uuid, TenderAttachment>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tenders.
    pub async fn tender_count(&self) -> usize {
        self.tenders.read().await.len()
    }

    /// Number of stored attachment records.
    pub async fn attachment_count(&self) -> usize {
        self.attachments.read().await.len()
    }
}

#[async_trait]
impl TenderStore for MemoryStore {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Tender>, StoreError> {
        let tenders = self.tenders.read().await;
        Ok(tenders
            .values()
            .find(|tender| tender.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn get_tender(&self, id: Uuid) -> Result<Option<Tender>, StoreError> {
        Ok(self.tenders.read().await.get(&id).cloned())
    }

    async fn upsert(&self, tender: Tender) -> Result<Tender, StoreError> {
        self.tenders.write().await.insert(tender.id, tender.clone());
        Ok(tender)
    }

    async fn update_embedding(&self, id: Uuid, embedding: Vec<f32>) -> Result<(), StoreError> {
        let mut tenders = self.tenders.write().await;
        let tender = tenders.get_mut(&id).ok_or(StoreError::MissingRecord {
            kind: "tender",
            id,
        })?;
        tender.requirement_embedding = Some(embedding);
        tender.processing_status = ProcessingStatus::Ready;
        tender.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn find_company_by_owner(&self, owner_id: Uuid) -> Result<Option<Company>, StoreError> {
        let companies = self.companies.read().await;
        Ok(companies
            .values()
            .find(|company| company.owner_id == owner_id)
            .cloned())
    }

    async fn upsert_company(&self, company: Company) -> Result<Company, StoreError> {
        self.companies
            .write()
            .await
            .insert(company.id, company.clone());
        Ok(company)
    }

    async fn query_candidate_tenders(
        &self,
        _company: &Company,
        now: OffsetDateTime,
    ) -> Result<Vec<Tender>, StoreError> {
        let tenders = self.tenders.read().await;
        Ok(tenders
            .values()
            .filter(|tender| tender.deadline_at > now)
            .cloned()
            .collect())
    }

    async fn insert_attachment(&self, attachment: TenderAttachment) -> Result<(), StoreError> {
        self.attachments
            .write()
            .await
            .insert(attachment.id, attachment);
        Ok(())
    }

    async fn get_attachment(&self, id: Uuid) -> Result<Option<TenderAttachment>, StoreError> {
        Ok(self.attachments.read().await.get(&id).cloned())
    }

    async fn record_attachment_ocr(
        &self,
        id: Uuid,
        content: String,
        embedding: Option<Vec<f32>>,
    ) -> Result<(), StoreError> {
        let mut attachments = self.attachments.write().await;
        let attachment = attachments.get_mut(&id).ok_or(StoreError::MissingRecord {
            kind: "attachment",
            id,
        })?;
        attachment.content_ocr = Some(content);
        attachment.content_embedding = embedding;
        attachment.ocr_processed = true;
        Ok(())
    }
}
