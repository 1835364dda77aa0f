use std::path::Path;

use super::IngestionError;

/// Processing path selected for an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `.xml`: structured notice parser.
    Notice,
    /// `.pdf`: OCR pipeline plus heuristics.
    Scan,
}

/// Lower-cased extension of `filename` without the dot; empty when there is none.
pub(crate) fn extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Select the processing path from the file extension, case-insensitively.
pub fn route(filename: &str) -> Result<DocumentKind, IngestionError> {
    match extension(filename).as_str() {
        "xml" => Ok(DocumentKind::Notice),
        "pdf" => Ok(DocumentKind::Scan),
        other => Err(IngestionError::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}
