//! OCR extraction for scanned tender documents.
//!
//! PDF pages are rasterized by a [`PageRenderer`] and transcribed one image at a time by a
//! [`VisionExtractor`]. Per-page failures are recorded as [`PageOutcome::Failed`] and skipped;
//! only a document without a single rendered page is an error.

mod pipeline;
mod render;
mod vision;
pub mod worker;

use thiserror::Error;

pub use pipeline::{OcrDocument, OcrPipeline, PAGE_DIVIDER, PageOutcome};
pub use render::{PageRenderer, PdfiumRenderer, RenderedPage};
pub use vision::{ChatVisionExtractor, OCR_PROMPT, VisionExtractor};

/// Errors raised by the OCR pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum OcrError {
    /// No page of the document could be rasterized.
    #[error("Document produced no page images")]
    EmptyDocument,
    /// The document or one of its pages could not be rendered.
    #[error("Failed to render page {page}: {reason}")]
    Render {
        /// Zero-based page index (0 for document-level failures).
        page: usize,
        /// Renderer diagnostic.
        reason: String,
    },
    /// The PDFium shared library could not be loaded.
    #[error("PDFium library unavailable: {0}")]
    LibraryUnavailable(String),
    /// The vision endpoint failed or returned no text.
    #[error("Vision extraction failed: {0}")]
    Extraction(String),
}
