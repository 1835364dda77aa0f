use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::GeoPoint;

/// Where a tender record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Structured eForms/UBL notice.
    #[serde(rename = "eforms-xml")]
    EformsXml,
    /// Scanned PDF transcribed by the vision OCR pipeline.
    #[serde(rename = "pdf-ocr")]
    PdfOcr,
}

/// Lifecycle of a tender record inside the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Record created, nothing extracted yet.
    Pending,
    /// Text comes from OCR and is awaiting its embedding.
    OcrProcessing,
    /// Structured fields decoded and awaiting the embedding.
    Parsed,
    /// Embedding attached; eligible for matching.
    Ready,
    /// Processing gave up on this record.
    Failed,
}

impl ProcessingStatus {
    /// Terminal states are never advanced by the pipeline.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// Postal location of the place of performance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenderLocation {
    /// Five-digit postal code when known.
    #[serde(default)]
    pub postal_code: Option<String>,
    /// City name without postal code.
    #[serde(default)]
    pub city: Option<String>,
    /// Geocoded coordinates when the lookup succeeded.
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
}

/// Canonical, store-ready representation of one procurement opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tender {
    /// Store identity.
    pub id: Uuid,
    /// Source-assigned identifier; unique when present.
    #[serde(default)]
    pub external_id: Option<String>,
    /// Source portal or document kind.
    pub source: SourceKind,
    /// Link to the procurement documents.
    #[serde(default)]
    pub source_url: Option<String>,
    /// Human-readable title.
    pub title: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Description including lot details.
    #[serde(default)]
    pub description_full: String,
    /// Plain text used for embedding and agent input.
    #[serde(default)]
    pub ocr_text: String,
    /// Ordered, duplicate-free category (CPV) codes.
    #[serde(default)]
    pub cpv_codes: Vec<String>,
    /// Ordered, duplicate-free country-subdivision (NUTS) codes.
    #[serde(default)]
    pub nuts_codes: Vec<String>,
    /// Procurement type or procedure code.
    #[serde(default)]
    pub procedure_type: Option<String>,
    /// Label of the awarding criterion.
    #[serde(default)]
    pub award_criteria: Option<String>,
    /// Publication timestamp.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    /// Submission deadline; always resolved.
    #[serde(with = "time::serde::rfc3339")]
    pub deadline_at: OffsetDateTime,
    /// Award date when announced.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub award_at: Option<OffsetDateTime>,
    /// Name of the contracting authority.
    #[serde(default)]
    pub authority_name: Option<String>,
    /// Street address of the contracting authority.
    #[serde(default)]
    pub authority_address: Option<String>,
    /// Place of performance.
    #[serde(default)]
    pub location: TenderLocation,
    /// Pipeline state.
    pub processing_status: ProcessingStatus,
    /// Requirement embedding; only set once the record is `ready`.
    #[serde(skip)]
    pub requirement_embedding: Option<Vec<f32>>,
    /// When the source document was fetched or uploaded.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scraped_at: Option<OffsetDateTime>,
    /// Creation time of the record.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last write to the record.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Tender {
    /// Start a fresh `pending` record with a random identity.
    pub fn new(source: SourceKind, title: impl Into<String>, deadline_at: OffsetDateTime) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            external_id: None,
            source,
            source_url: None,
            title: title.into(),
            description: String::new(),
            description_full: String::new(),
            ocr_text: String::new(),
            cpv_codes: Vec::new(),
            nuts_codes: Vec::new(),
            procedure_type: None,
            award_criteria: None,
            published_at: None,
            deadline_at,
            award_at: None,
            authority_name: None,
            authority_address: None,
            location: TenderLocation::default(),
            processing_status: ProcessingStatus::Pending,
            requirement_embedding: None,
            scraped_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Text sent to the embedding service for this record.
    ///
    /// Structured notices combine title, full description and codes. Scanned documents use the
    /// transcription, or the title when nothing could be transcribed.
    pub fn embedding_text(&self) -> String {
        match self.source {
            SourceKind::EformsXml => format!(
                "{}\n{}\n{}",
                self.title,
                self.description_full,
                self.cpv_codes.join(" ")
            ),
            SourceKind::PdfOcr if self.ocr_text.trim().is_empty() => self.title.clone(),
            SourceKind::PdfOcr => self.ocr_text.clone(),
        }
    }
}

/// Append `code` unless it is blank or already present; keeps first-seen order.
pub fn append_unique(codes: &mut Vec<String>, code: &str) {
    let code = code.trim();
    if code.is_empty() || codes.iter().any(|existing| existing == code) {
        return;
    }
    codes.push(code.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn append_unique_preserves_first_seen_order() {
        let mut codes = Vec::new();
        for code in ["A", "B", "B", "C", " ", "A"] {
            append_unique(&mut codes, code);
        }
        assert_eq!(codes, vec!["A", "B", "C"]);
    }

    #[test]
    fn status_serializes_snake_case() {
        let value = serde_json::to_value(ProcessingStatus::OcrProcessing).expect("serialize");
        assert_eq!(value, "ocr_processing");
        assert!(ProcessingStatus::Ready.is_terminal());
        assert!(!ProcessingStatus::Parsed.is_terminal());
    }

    #[test]
    fn payload_roundtrip_drops_embedding() {
        let mut tender = Tender::new(
            SourceKind::EformsXml,
            "Road works",
            datetime!(2025-03-01 12:00 UTC),
        );
        tender.requirement_embedding = Some(vec![0.1, 0.2]);
        tender.cpv_codes = vec!["45233120".into()];

        let value = serde_json::to_value(&tender).expect("serialize");
        assert_eq!(value["source"], "eforms-xml");
        assert_eq!(value["deadline_at"], "2025-03-01T12:00:00Z");
        assert!(value.get("requirement_embedding").is_none());

        let decoded: Tender = serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded.requirement_embedding, None);
        assert_eq!(decoded.cpv_codes, tender.cpv_codes);
        assert_eq!(decoded.id, tender.id);
    }

    #[test]
    fn scanned_tender_embeds_title_when_transcription_is_empty() {
        let mut tender = Tender::new(
            SourceKind::PdfOcr,
            "Untitled tender (OCR)",
            datetime!(2025-01-01 0:00 UTC),
        );
        assert_eq!(tender.embedding_text(), "Untitled tender (OCR)");
        tender.ocr_text = "Bauleistungen".into();
        assert_eq!(tender.embedding_text(), "Bauleistungen");
    }
}
