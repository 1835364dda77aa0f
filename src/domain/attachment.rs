use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// File extensions accepted as tender attachments.
pub const ATTACHMENT_EXTENSIONS: [&str; 5] = ["pdf", "doc", "docx", "xls", "xlsx"];

/// Supporting document uploaded for an existing tender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenderAttachment {
    /// Store identity.
    pub id: Uuid,
    /// Tender the file belongs to.
    pub tender_id: Uuid,
    /// Original filename.
    pub filename: String,
    /// Display title, defaults to the filename.
    pub title: String,
    /// Caller-supplied document category.
    #[serde(default)]
    pub document_type: Option<String>,
    /// Caller-supplied description.
    #[serde(default)]
    pub description: Option<String>,
    /// Object-storage key, `<tender_id>/<attachment_id>.<ext>`.
    pub storage_path: String,
    /// MIME type derived from the extension.
    pub mime_type: String,
    /// Size of the upload in bytes.
    pub file_size: u64,
    /// Transcribed text once background OCR finished.
    #[serde(default)]
    pub content_ocr: Option<String>,
    /// Set when background OCR has written its result.
    #[serde(default)]
    pub ocr_processed: bool,
    /// Embedding of the transcribed text.
    #[serde(skip)]
    pub content_embedding: Option<Vec<f32>>,
    /// Upload time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// MIME type for an accepted attachment extension.
pub(crate) fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}
