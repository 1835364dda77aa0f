//! Upload ingestion: routing, notice and scan paths, attachments.

mod attachments;
mod heuristics;
mod locks;
mod router;
mod service;

use thiserror::Error;
use uuid::Uuid;

use crate::app::ErrorKind;
use crate::embedding::EmbeddingError;
use crate::geocoding::GeocodingError;
use crate::notice::NoticeError;
use crate::ocr::OcrError;
use crate::ocr::worker::SubmitError;
use crate::store::StoreError;

pub use attachments::{AttachmentOcrHandler, AttachmentUpload};
pub use heuristics::{SCAN_DEADLINE_FALLBACK, UNTITLED_SCAN, extract_deadline, extract_title};
pub use locks::KeyedLocks;
pub use router::{DocumentKind, route};
pub use service::{IngestionService, identity_for};

/// Errors raised while ingesting tenders or attachments.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// File extension not accepted for this upload.
    #[error("Unsupported file format: .{extension}")]
    UnsupportedFormat {
        /// Rejected extension, lower-cased, possibly empty.
        extension: String,
    },
    /// Notice gate or XML decoding failed.
    #[error(transparent)]
    Notice(#[from] NoticeError),
    /// OCR could not produce a document.
    #[error(transparent)]
    Ocr(#[from] OcrError),
    /// Embedding service failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// Geocoding service failed.
    #[error(transparent)]
    Geocoding(#[from] GeocodingError),
    /// Store read or write failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Referenced tender does not exist.
    #[error("Tender {0} not found")]
    TenderNotFound(Uuid),
    /// Referenced attachment does not exist.
    #[error("Attachment {0} not found")]
    AttachmentNotFound(Uuid),
    /// Background OCR queue rejected the job.
    #[error("OCR queue is full; retry later")]
    OcrQueueFull,
    /// Background OCR pool is not running.
    #[error("OCR worker pool is not running")]
    OcrUnavailable,
}

impl From<SubmitError> for IngestionError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::QueueFull => Self::OcrQueueFull,
            SubmitError::Closed => Self::OcrUnavailable,
        }
    }
}

impl IngestionError {
    /// Category used for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } => ErrorKind::Validation,
            Self::Notice(NoticeError::Parse(_)) => ErrorKind::Parse,
            Self::Notice(_) => ErrorKind::Validation,
            Self::Ocr(OcrError::EmptyDocument) => ErrorKind::Validation,
            Self::Ocr(OcrError::Render { .. }) => ErrorKind::Parse,
            Self::Ocr(_) => ErrorKind::ExternalService,
            Self::Embedding(_)
            | Self::Geocoding(_)
            | Self::OcrQueueFull
            | Self::OcrUnavailable => ErrorKind::ExternalService,
            Self::Store(_) => ErrorKind::Persistence,
            Self::TenderNotFound(_) | Self::AttachmentNotFound(_) => ErrorKind::NotFound,
        }
    }
}
