//! PDF page rasterization through PDFium.
//!
//! The upstream `Pdfium` handle is `!Send`, so each document binds the library afresh inside the
//! blocking task and renders all of its pages from one parsed copy.

use std::io::Cursor;

use image::ImageFormat;
use pdfium_render::prelude::*;

use super::OcrError;

/// Longest rendered side in pixels.
const MAX_DIMENSION_PX: u32 = 4096;

const POINTS_PER_INCH: f32 = 72.0;

/// PNG bytes of one page, or the reason that page alone failed.
pub type RenderedPage = Result<Vec<u8>, OcrError>;

/// Rasterizes the pages of a PDF into PNG bytes.
///
/// Implementations are synchronous; async callers run them on the blocking pool.
pub trait PageRenderer: Send + Sync {
    /// Render every page of `pdf` at `dpi`, one slot per page in page order.
    ///
    /// The outer error is document-level (unreadable PDF, missing library).
    fn render_pages(&self, pdf: &[u8], dpi: u32) -> Result<Vec<RenderedPage>, OcrError>;
}

/// [`PageRenderer`] backed by Google PDFium.
///
/// The library is located through `PDFIUM_DYNAMIC_LIB_PATH`, next to the executable, or on the
/// system library path, in that order.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumRenderer;

impl PdfiumRenderer {
    /// Create a renderer; the library is bound lazily on first use.
    pub const fn new() -> Self {
        Self
    }

    /// Check that the PDFium library can be bound.
    pub fn probe(&self) -> Result<(), OcrError> {
        load_pdfium().map(|_| ())
    }
}

fn load_pdfium() -> Result<Pdfium, OcrError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|err| OcrError::LibraryUnavailable(format!("{path}: {err}")))?;
        return Ok(Pdfium::new(bindings));
    }

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
    {
        let candidate = Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&candidate) {
            tracing::debug!(dir = %dir.display(), "Loaded PDFium next to executable");
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|err| OcrError::LibraryUnavailable(err.to_string()))
}

fn load_document<'a>(pdfium: &'a Pdfium, pdf: &'a [u8]) -> Result<PdfDocument<'a>, OcrError> {
    pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|err| OcrError::Render {
            page: 0,
            reason: format!("failed to load PDF: {err}"),
        })
}

/// Pixel size for a page of `width` x `height` points at `dpi`, capped at
/// [`MAX_DIMENSION_PX`] on the longest side with the aspect ratio preserved.
fn render_dimensions(width: f32, height: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width * scale).max(1.0);
    let raw_h = (height * scale).max(1.0);

    let longest = raw_w.max(raw_h);
    if longest <= MAX_DIMENSION_PX as f32 {
        return (raw_w as u32, raw_h as u32);
    }
    let ratio = MAX_DIMENSION_PX as f32 / longest;
    (
        ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX),
        ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX),
    )
}

fn render_page(pdf_page: &PdfPage<'_>, page: usize, dpi: u32) -> RenderedPage {
    let render_error = |reason: String| OcrError::Render { page, reason };

    let (width, height) = render_dimensions(pdf_page.width().value, pdf_page.height().value, dpi);
    let config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_maximum_height(height as i32);

    let bitmap = pdf_page
        .render_with_config(&config)
        .map_err(|err| render_error(err.to_string()))?;

    let mut png = Cursor::new(Vec::new());
    bitmap
        .as_image()
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|err| render_error(format!("PNG encoding failed: {err}")))?;
    Ok(png.into_inner())
}

impl PageRenderer for PdfiumRenderer {
    fn render_pages(&self, pdf: &[u8], dpi: u32) -> Result<Vec<RenderedPage>, OcrError> {
        let pdfium = load_pdfium()?;
        let document = load_document(&pdfium, pdf)?;
        Ok(document
            .pages()
            .iter()
            .enumerate()
            .map(|(page, pdf_page)| render_page(&pdf_page, page, dpi))
            .collect())
    }
}
