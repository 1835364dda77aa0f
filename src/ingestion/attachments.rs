use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::router::extension;
use super::{IngestionError, IngestionService};
use crate::domain::{ATTACHMENT_EXTENSIONS, TenderAttachment, mime_for_extension};
use crate::embedding::{EmbeddingClient, embed_one};
use crate::ocr::OcrPipeline;
use crate::ocr::worker::{OcrJob, OcrJobHandler};
use crate::store::TenderStore;

/// Supporting document uploaded for an existing tender.
#[derive(Debug, Clone, Default)]
pub struct AttachmentUpload {
    /// Original filename; its extension selects the MIME type.
    pub filename: String,
    /// File content.
    pub bytes: Vec<u8>,
    /// Display title; the filename when absent.
    pub title: Option<String>,
    /// Document category.
    pub document_type: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl IngestionService {
    /// Record an attachment and queue background OCR for PDFs.
    ///
    /// Returns as soon as the record is stored; poll [`IngestionService::get_attachment`] for
    /// `ocr_processed`.
    pub async fn upload_attachment(
        &self,
        tender_id: Uuid,
        upload: AttachmentUpload,
    ) -> Result<TenderAttachment, IngestionError> {
        if self.store.get_tender(tender_id).await?.is_none() {
            return Err(IngestionError::TenderNotFound(tender_id));
        }

        let ext = extension(&upload.filename);
        if !ATTACHMENT_EXTENSIONS.contains(&ext.as_str()) {
            return Err(IngestionError::UnsupportedFormat { extension: ext });
        }

        // reserved before the insert: a rejected job must not leave a record behind
        let ocr_slot = match ext.as_str() {
            "pdf" => Some(self.ocr_jobs.reserve()?),
            _ => None,
        };

        let id = Uuid::new_v4();
        let attachment = TenderAttachment {
            id,
            tender_id,
            title: non_blank(upload.title).unwrap_or_else(|| upload.filename.clone()),
            filename: upload.filename,
            document_type: non_blank(upload.document_type),
            description: non_blank(upload.description),
            storage_path: format!("{tender_id}/{id}.{ext}"),
            mime_type: mime_for_extension(&ext).to_string(),
            file_size: upload.bytes.len() as u64,
            content_ocr: None,
            ocr_processed: false,
            content_embedding: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.store.insert_attachment(attachment.clone()).await?;

        if let Some(slot) = ocr_slot {
            slot.send(OcrJob {
                attachment_id: id,
                tender_id,
                pdf: upload.bytes,
            });
            self.metrics.record_attachment_queued();
            tracing::info!(%tender_id, attachment_id = %id, "Attachment stored; OCR queued");
        } else {
            tracing::info!(%tender_id, attachment_id = %id, %ext, "Attachment stored");
        }
        Ok(attachment)
    }

    /// Attachment by identity.
    pub async fn get_attachment(&self, id: Uuid) -> Result<TenderAttachment, IngestionError> {
        self.store
            .get_attachment(id)
            .await?
            .ok_or(IngestionError::AttachmentNotFound(id))
    }
}

/// Background job: transcribe an attachment, embed the text and store both.
pub struct AttachmentOcrHandler {
    store: Arc<dyn TenderStore>,
    pipeline: Arc<OcrPipeline>,
    embedder: Arc<dyn EmbeddingClient>,
    dimension: usize,
}

impl AttachmentOcrHandler {
    /// Handler writing into `store`.
    pub fn new(
        store: Arc<dyn TenderStore>,
        pipeline: Arc<OcrPipeline>,
        embedder: Arc<dyn EmbeddingClient>,
        dimension: usize,
    ) -> Self {
        Self {
            store,
            pipeline,
            embedder,
            dimension,
        }
    }
}

#[async_trait]
impl OcrJobHandler for AttachmentOcrHandler {
    async fn handle(&self, job: OcrJob) -> anyhow::Result<()> {
        let attachment_id = job.attachment_id;
        tracing::info!(%attachment_id, "Starting attachment OCR");

        let document = self
            .pipeline
            .extract_document(job.pdf)
            .await
            .with_context(|| format!("OCR failed for attachment {attachment_id}"))?;
        let text = document.text();

        let embedding = if text.trim().is_empty() {
            None
        } else {
            Some(
                embed_one(self.embedder.as_ref(), text.clone(), self.dimension)
                    .await
                    .context("embedding attachment text")?,
            )
        };

        let chars = text.chars().count();
        self.store
            .record_attachment_ocr(attachment_id, text, embedding)
            .await
            .context("saving OCR result")?;
        tracing::info!(
            %attachment_id,
            chars,
            failed_pages = document.failed_pages(),
            "Attachment OCR completed"
        );
        Ok(())
    }
}
