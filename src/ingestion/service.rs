use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use super::IngestionError;
use super::heuristics::{extract_deadline, extract_title};
use super::locks::KeyedLocks;
use super::router::{DocumentKind, route};
use crate::domain::{DEFAULT_COUNTRY, ProcessingStatus, SourceKind, Tender};
use crate::embedding::{EmbeddingClient, embed_one};
use crate::geocoding::Geocoder;
use crate::metrics::IngestionMetrics;
use crate::notice::parse_notice;
use crate::ocr::OcrPipeline;
use crate::ocr::worker::OcrWorkerPool;
use crate::store::TenderStore;

/// Turns uploaded documents into stored, embedded tenders.
pub struct IngestionService {
    pub(super) store: Arc<dyn TenderStore>,
    pub(super) embedder: Arc<dyn EmbeddingClient>,
    geocoder: Arc<dyn Geocoder>,
    ocr: Arc<OcrPipeline>,
    pub(super) ocr_jobs: OcrWorkerPool,
    pub(super) metrics: Arc<IngestionMetrics>,
    pub(super) dimension: usize,
    locks: KeyedLocks,
}

/// Stable identity for a tender with a source identifier.
///
/// Concurrent first ingestions of one notice, even from separate processes, converge on the
/// same record.
pub fn identity_for(external_id: &str) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("urn:tender:{external_id}").as_bytes(),
    )
}

impl IngestionService {
    /// Service over the given collaborators; `dimension` is the expected embedding length.
    pub fn new(
        store: Arc<dyn TenderStore>,
        embedder: Arc<dyn EmbeddingClient>,
        geocoder: Arc<dyn Geocoder>,
        ocr: Arc<OcrPipeline>,
        ocr_jobs: OcrWorkerPool,
        metrics: Arc<IngestionMetrics>,
        dimension: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            geocoder,
            ocr,
            ocr_jobs,
            metrics,
            dimension,
            locks: KeyedLocks::new(),
        }
    }

    /// Route, parse, persist and embed one uploaded document.
    pub async fn process_upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<Tender, IngestionError> {
        let kind = route(filename)?;
        tracing::info!(filename, ?kind, size = bytes.len(), "Processing upload");
        match kind {
            DocumentKind::Notice => self.process_notice(&bytes).await,
            DocumentKind::Scan => self.process_scan(bytes).await,
        }
    }

    async fn process_notice(&self, xml: &[u8]) -> Result<Tender, IngestionError> {
        let now = OffsetDateTime::now_utc();
        let mut tender = parse_notice(xml, now)?;
        self.locate(&mut tender).await?;

        let tender = match tender.external_id.clone() {
            Some(external_id) => {
                let _guard = self.locks.lock(&external_id).await;
                match self.store.find_by_external_id(&external_id).await? {
                    Some(existing) => {
                        tracing::debug!(%external_id, tender_id = %existing.id, "Updating existing tender");
                        tender.id = existing.id;
                        tender.created_at = existing.created_at;
                    }
                    None => tender.id = identity_for(&external_id),
                }
                tender.updated_at = now;
                let stored = self.store.upsert(tender).await?;
                self.attach_embedding(stored).await?
            }
            None => {
                let stored = self.store.upsert(tender).await?;
                self.attach_embedding(stored).await?
            }
        };

        self.metrics.record_notice();
        tracing::info!(tender_id = %tender.id, external_id = ?tender.external_id, "Notice ingested");
        Ok(tender)
    }

    async fn process_scan(&self, pdf: Vec<u8>) -> Result<Tender, IngestionError> {
        let document = self.ocr.extract_document(pdf).await?;
        let text = document.text();
        let failed_pages = document.failed_pages();
        if text.is_empty() {
            tracing::warn!(failed_pages, "No page could be transcribed; continuing with empty text");
        }

        let now = OffsetDateTime::now_utc();
        let mut tender = Tender::new(
            SourceKind::PdfOcr,
            extract_title(&text),
            extract_deadline(&text, now),
        );
        tender.description_full = text.clone();
        tender.ocr_text = text;
        tender.processing_status = ProcessingStatus::OcrProcessing;

        let stored = self.store.upsert(tender).await?;
        let tender = self.attach_embedding(stored).await?;

        self.metrics.record_scan(failed_pages as u64);
        tracing::info!(tender_id = %tender.id, failed_pages, "Scan ingested");
        Ok(tender)
    }

    /// Geocode the place of performance when a postal code or city is known.
    async fn locate(&self, tender: &mut Tender) -> Result<(), IngestionError> {
        let location = &tender.location;
        if location.postal_code.is_none() && location.city.is_none() {
            return Ok(());
        }
        let coordinates = self
            .geocoder
            .geocode(
                location.postal_code.as_deref(),
                location.city.as_deref(),
                Some(DEFAULT_COUNTRY),
            )
            .await?;
        tender.location.coordinates = coordinates;
        Ok(())
    }

    /// Second write step: embed and mark ready, or mark failed and propagate.
    async fn attach_embedding(&self, mut tender: Tender) -> Result<Tender, IngestionError> {
        match embed_one(self.embedder.as_ref(), tender.embedding_text(), self.dimension).await {
            Ok(vector) => {
                self.store.update_embedding(tender.id, vector.clone()).await?;
                tender.requirement_embedding = Some(vector);
                tender.processing_status = ProcessingStatus::Ready;
                Ok(tender)
            }
            Err(err) => {
                tracing::error!(tender_id = %tender.id, error = %err, "Embedding failed");
                tender.processing_status = ProcessingStatus::Failed;
                if let Err(store_err) = self.store.upsert(tender).await {
                    tracing::warn!(error = %store_err, "Could not mark tender as failed");
                }
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::app::ErrorKind;
    use crate::embedding::{EmbeddingError, HashingEmbeddingClient};
    use crate::domain::GeoPoint;
    use crate::geocoding::{DisabledGeocoder, GeocodingError};
    use crate::ocr::worker::{OcrJob, OcrJobHandler};
    use crate::store::MemoryStore;
    use crate::test_support::{ScriptedExtractor, ScriptedRenderer};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use time::macros::datetime;

    pub(crate) const DIMENSION: usize = 8;

    struct NoopHandler;

    #[async_trait]
    impl OcrJobHandler for NoopHandler {
        async fn handle(&self, _job: OcrJob) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct FixedGeocoder(GeoPoint);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn geocode(
            &self,
            _postal_code: Option<&str>,
            _city: Option<&str>,
            _country: Option<&str>,
        ) -> Result<Option<GeoPoint>, GeocodingError> {
            Ok(Some(self.0))
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl EmbeddingClient for DownEmbedder {
        async fn generate_embeddings(
            &self,
            _texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Unavailable("connection refused".into()))
        }
    }

    pub(crate) fn pipeline(pages: &[(&[u8], Option<&str>)]) -> Arc<OcrPipeline> {
        let renderer = ScriptedRenderer {
            pages: pages.iter().map(|(png, _)| Some(png.to_vec())).collect(),
        };
        let extractor = ScriptedExtractor {
            texts: pages
                .iter()
                .filter_map(|(png, text)| text.map(|t| (png.to_vec(), t.to_string())))
                .collect::<HashMap<_, _>>(),
        };
        Arc::new(OcrPipeline::new(Arc::new(renderer), Arc::new(extractor)))
    }

    pub(crate) fn service_with(
        store: Arc<MemoryStore>,
        embedder: Arc<dyn EmbeddingClient>,
        geocoder: Arc<dyn Geocoder>,
        ocr: Arc<OcrPipeline>,
    ) -> IngestionService {
        IngestionService::new(
            store,
            embedder,
            geocoder,
            ocr,
            OcrWorkerPool::spawn(Arc::new(NoopHandler), 1, 4),
            Arc::new(IngestionMetrics::new()),
            DIMENSION,
        )
    }

    fn service(store: Arc<MemoryStore>) -> IngestionService {
        service_with(
            store,
            Arc::new(HashingEmbeddingClient::new(DIMENSION)),
            Arc::new(DisabledGeocoder),
            pipeline(&[]),
        )
    }

    fn notice(id: &str, title: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ContractNotice xmlns:cbc="urn:cbc" xmlns:cac="urn:cac">
  <cbc:ID>{id}</cbc:ID>
  <cac:TenderingProcess>
    <cac:TenderSubmissionDeadlinePeriod>
      <cbc:EndDate>2030-03-01</cbc:EndDate>
      <cbc:EndTime>12:00:00+01:00</cbc:EndTime>
    </cac:TenderSubmissionDeadlinePeriod>
  </cac:TenderingProcess>
  <cac:ProcurementProject>
    <cbc:Name>{title}</cbc:Name>
    <cbc:Description>Erneuerung der Fahrbahndecke</cbc:Description>
    <cac:MainCommodityClassification>
      <cbc:ItemClassificationCode>45233120</cbc:ItemClassificationCode>
    </cac:MainCommodityClassification>
    <cac:RealizedLocation>
      <cac:Address>
        <cbc:CityName>84034 Landshut</cbc:CityName>
      </cac:Address>
    </cac:RealizedLocation>
  </cac:ProcurementProject>
</ContractNotice>"#
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn reingesting_a_notice_updates_in_place() {
        let store = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store));

        let first = service
            .process_upload(notice("N-1", "Straßenbau Los 1"), "n.xml")
            .await
            .expect("first");
        let second = service
            .process_upload(notice("N-1", "Straßenbau Los 1 (berichtigt)"), "n.xml")
            .await
            .expect("second");

        assert_eq!(first.id, second.id);
        assert_eq!(first.id, identity_for("N-1"));
        assert_eq!(store.tender_count().await, 1);

        let stored = store.get_tender(first.id).await.expect("get").expect("tender");
        assert_eq!(stored.title, "Straßenbau Los 1 (berichtigt)");
        assert_eq!(stored.processing_status, ProcessingStatus::Ready);
        assert_eq!(stored.requirement_embedding.map(|v| v.len()), Some(DIMENSION));
        assert_eq!(stored.deadline_at, datetime!(2030-03-01 12:00 UTC));
    }

    #[tokio::test]
    async fn concurrent_uploads_of_one_notice_store_one_record() {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(service(Arc::clone(&store)));

        let uploads = (0..4).map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .process_upload(notice("N-2", &format!("Version {i}")), "n.xml")
                    .await
            })
        });
        for upload in uploads {
            upload.await.expect("join").expect("ingested");
        }
        assert_eq!(store.tender_count().await, 1);
    }

    #[tokio::test]
    async fn notices_are_geocoded() {
        let store = Arc::new(MemoryStore::new());
        let landshut = GeoPoint::new(48.537, 12.152);
        let service = service_with(
            Arc::clone(&store),
            Arc::new(HashingEmbeddingClient::new(DIMENSION)),
            Arc::new(FixedGeocoder(landshut)),
            pipeline(&[]),
        );

        let tender = service
            .process_upload(notice("N-3", "Kanalbau"), "N.XML")
            .await
            .expect("ingested");
        assert_eq!(tender.location.postal_code.as_deref(), Some("84034"));
        assert_eq!(tender.location.city.as_deref(), Some("Landshut"));
        assert_eq!(tender.location.coordinates, Some(landshut));
    }

    #[tokio::test]
    async fn unsupported_uploads_are_rejected_before_any_write() {
        let store = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store));

        let err = service
            .process_upload(b"PK".to_vec(), "angebot.zip")
            .await
            .expect_err("zip");
        assert_eq!(err.kind(), ErrorKind::Validation);

        let award = b"<ContractAwardNotice><broken".to_vec();
        let err = service
            .process_upload(award, "award.xml")
            .await
            .expect_err("award");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.tender_count().await, 0);
    }

    #[tokio::test]
    async fn scans_use_heuristics() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(
            Arc::clone(&store),
            Arc::new(HashingEmbeddingClient::new(DIMENSION)),
            Arc::new(DisabledGeocoder),
            pipeline(&[
                (b"page-1", Some("Seite 1\nStraßenbauarbeiten Gemeinde Nord\nFrist 15.06.2025")),
                (b"page-2", None),
            ]),
        );

        let tender = service
            .process_upload(b"%PDF-1.7".to_vec(), "scan.pdf")
            .await
            .expect("scan");

        assert_eq!(tender.source, SourceKind::PdfOcr);
        assert_eq!(tender.title, "Straßenbauarbeiten Gemeinde Nord");
        assert_eq!(tender.deadline_at, datetime!(2025-06-15 0:00 UTC));
        assert_eq!(tender.processing_status, ProcessingStatus::Ready);
        assert!(tender.ocr_text.starts_with("Seite 1\n"));
    }

    #[tokio::test]
    async fn scans_without_any_transcription_still_ingest() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(
            Arc::clone(&store),
            Arc::new(HashingEmbeddingClient::new(DIMENSION)),
            Arc::new(DisabledGeocoder),
            pipeline(&[(b"page-1", None)]),
        );

        let tender = service
            .process_upload(b"%PDF-1.7".to_vec(), "scan.pdf")
            .await
            .expect("empty text is not an error");
        assert_eq!(tender.title, crate::ingestion::UNTITLED_SCAN);
        assert_eq!(tender.ocr_text, "");
    }

    #[tokio::test]
    async fn scans_without_pages_fail() {
        let service = service(Arc::new(MemoryStore::new()));
        let err = service
            .process_upload(b"%PDF-1.7".to_vec(), "scan.pdf")
            .await
            .expect_err("no pages");
        assert!(matches!(err, IngestionError::Ocr(crate::ocr::OcrError::EmptyDocument)));
    }

    #[tokio::test]
    async fn embedding_failure_marks_tender_failed_and_propagates() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(
            Arc::clone(&store),
            Arc::new(DownEmbedder),
            Arc::new(DisabledGeocoder),
            pipeline(&[]),
        );

        let err = service
            .process_upload(notice("N-4", "Hochbau"), "n.xml")
            .await
            .expect_err("embedding down");
        assert_eq!(err.kind(), ErrorKind::ExternalService);

        let stored = store
            .get_tender(identity_for("N-4"))
            .await
            .expect("get")
            .expect("record kept");
        assert_eq!(stored.processing_status, ProcessingStatus::Failed);
        assert!(stored.requirement_embedding.is_none());
    }
}
