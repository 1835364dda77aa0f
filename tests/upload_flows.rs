//! End-to-end flows over the in-memory store with scripted collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tendermatch::app::{App, AppOptions, Collaborators, ErrorKind, TenderApi};
use tendermatch::company::CompanyInput;
use tendermatch::compliance::{
    ComplianceAgent, ComplianceAssessment, ComplianceError, ComplianceInput,
};
use tendermatch::domain::{ProcessingStatus, SourceKind};
use tendermatch::embedding::HashingEmbeddingClient;
use tendermatch::geocoding::DisabledGeocoder;
use tendermatch::ingestion::AttachmentUpload;
use tendermatch::ocr::{OcrError, OcrPipeline, PageRenderer, RenderedPage, VisionExtractor};
use tendermatch::store::MemoryStore;
use time::macros::datetime;
use uuid::Uuid;

const DIMENSION: usize = 16;

const SCAN_TEXT: &str = "Amt\n\
Straßenbauarbeiten Gemeinde Nord\n\
Angebotsfrist: 15.06.2025";

struct OnePageRenderer;

impl PageRenderer for OnePageRenderer {
    fn render_pages(&self, pdf: &[u8], _dpi: u32) -> Result<Vec<RenderedPage>, OcrError> {
        if pdf.starts_with(b"%PDF") {
            Ok(vec![Ok(b"page-image".to_vec())])
        } else {
            Err(OcrError::Render {
                page: 0,
                reason: "not a PDF".into(),
            })
        }
    }
}

struct FixedText(&'static str);

#[async_trait]
impl VisionExtractor for FixedText {
    async fn extract(&self, _png: &[u8]) -> Result<String, OcrError> {
        Ok(self.0.to_string())
    }
}

struct ApprovingAgent;

#[async_trait]
impl ComplianceAgent for ApprovingAgent {
    async fn assess(
        &self,
        input: &ComplianceInput,
    ) -> Result<ComplianceAssessment, ComplianceError> {
        Ok(ComplianceAssessment {
            is_feasible: input.profile_summary.contains("45233120"),
            blockers: Vec::new(),
        })
    }
}

fn app() -> App {
    App::new(
        Collaborators {
            store: Arc::new(MemoryStore::new()),
            embedder: Arc::new(HashingEmbeddingClient::new(DIMENSION)),
            geocoder: Arc::new(DisabledGeocoder),
            ocr: Arc::new(OcrPipeline::new(
                Arc::new(OnePageRenderer),
                Arc::new(FixedText(SCAN_TEXT)),
            )),
            agent: Arc::new(ApprovingAgent),
        },
        AppOptions {
            dimension: DIMENSION,
            ocr_workers: 1,
            ocr_queue_capacity: 4,
        },
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
  </cac:ProcurementProject>
</ContractNotice>"#
    )
    .into_bytes()
}

fn company() -> CompanyInput {
    CompanyInput {
        name: "Tiefbau Nord GmbH".into(),
        industry: Some("Straßenbau".into()),
        category_tags: vec!["45233120".into()],
        profile_summary: "Fahrbahnsanierung und Kanalbau".into(),
        ..CompanyInput::default()
    }
}

#[tokio::test]
async fn scanned_tender_gets_title_and_deadline_from_text() {
    let app = app();
    let tender = app
        .process_upload(b"%PDF-1.7 scan".to_vec(), "ausschreibung.pdf")
        .await
        .expect("scan ingested");

    assert_eq!(tender.source, SourceKind::PdfOcr);
    assert_eq!(tender.title, "Straßenbauarbeiten Gemeinde Nord");
    assert_eq!(tender.deadline_at, datetime!(2025-06-15 0:00 UTC));
    assert_eq!(tender.ocr_text, SCAN_TEXT);
    assert_eq!(tender.processing_status, ProcessingStatus::Ready);
    assert_eq!(app.metrics_snapshot().scans_ingested, 1);
}

#[tokio::test]
async fn repeated_notice_upload_keeps_one_identity() {
    let app = app();
    let first = app
        .process_upload(notice("2030-0001", "Sanierung B 12"), "notice.xml")
        .await
        .expect("first");
    let second = app
        .process_upload(notice("2030-0001", "Sanierung B 12, Los 2"), "notice.xml")
        .await
        .expect("second");

    assert_eq!(first.id, second.id);
    assert_eq!(second.title, "Sanierung B 12, Los 2");
    assert_eq!(app.metrics_snapshot().notices_ingested, 2);
}

#[tokio::test]
async fn award_notices_are_rejected_as_validation_errors() {
    let app = app();
    let err = app
        .process_upload(
            b"<ContractAwardNotice><cbc:ID>x</cbc:ID></ContractAwardNotice>".to_vec(),
            "award.xml",
        )
        .await
        .expect_err("award notice");
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn company_sees_category_match_and_compliance_verdict() {
    let app = app();
    let owner = Uuid::new_v4();
    let tender = app
        .process_upload(notice("2030-0002", "Fahrbahnerneuerung Ortsdurchfahrt"), "n.xml")
        .await
        .expect("notice");

    let err = app.find_matches(owner, None).await.expect_err("no profile");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    app.upsert_company(owner, company()).await.expect("company");
    let matches = app.find_matches(owner, Some(10)).await.expect("matches");

    assert_eq!(matches.len(), 1);
    let found = &matches[0];
    assert_eq!(found.tender_id, tender.id);
    assert_eq!(found.signals.cpv_score, 1.0);
    assert_eq!(found.signals.geo_score, 0.3);
    assert!(found.signals.distance_km.is_none());
    assert_eq!(found.tender.title, "Fahrbahnerneuerung Ortsdurchfahrt");

    let check = app
        .check_compliance(owner, tender.id)
        .await
        .expect("verdict");
    assert!(check.is_feasible);
    assert!(check.missing_docs.is_empty());
    assert_eq!(app.metrics_snapshot().match_queries, 1);
}

#[tokio::test]
async fn pdf_attachment_is_transcribed_in_background() {
    let app = app();
    let tender = app
        .process_upload(notice("2030-0003", "Brückenneubau"), "n.xml")
        .await
        .expect("notice");

    let attachment = app
        .upload_attachment(
            tender.id,
            AttachmentUpload {
                filename: "leistungsverzeichnis.pdf".into(),
                bytes: b"%PDF-1.4 lv".to_vec(),
                title: Some("Leistungsverzeichnis".into()),
                ..AttachmentUpload::default()
            },
        )
        .await
        .expect("queued");
    assert!(!attachment.ocr_processed);
    assert_eq!(attachment.mime_type, "application/pdf");

    let mut transcribed = None;
    for _ in 0..200 {
        let current = app.get_attachment(attachment.id).await.expect("poll");
        if current.ocr_processed {
            transcribed = Some(current);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let transcribed = transcribed.expect("background OCR finished");
    assert_eq!(transcribed.content_ocr.as_deref(), Some(SCAN_TEXT));
    assert_eq!(transcribed.title, "Leistungsverzeichnis");
    assert_eq!(app.metrics_snapshot().attachments_queued, 1);
}
