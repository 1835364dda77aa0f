use std::sync::Arc;

use futures_util::{StreamExt, stream};

use super::{OcrError, PageRenderer, VisionExtractor};

/// Separator placed between the transcriptions of consecutive pages.
pub const PAGE_DIVIDER: &str = "\n\n---\n\n";

/// Default raster resolution.
pub const DEFAULT_RENDER_DPI: u32 = 150;

const DEFAULT_PAGE_CONCURRENCY: usize = 4;

/// Result of transcribing a single rendered page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// The page was transcribed.
    Text {
        /// Zero-based page index.
        page: usize,
        /// Transcribed markdown.
        text: String,
    },
    /// The page was rendered but its extraction call failed; it is skipped.
    Failed {
        /// Zero-based page index.
        page: usize,
        /// Extraction diagnostic.
        reason: String,
    },
}

/// Per-page outcomes of one document, in page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrDocument {
    /// Outcomes for every page that produced an image.
    pub pages: Vec<PageOutcome>,
}

impl OcrDocument {
    /// Successful transcriptions joined with [`PAGE_DIVIDER`]; empty when every page failed.
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .filter_map(|outcome| match outcome {
                PageOutcome::Text { text, .. } => Some(text.as_str()),
                PageOutcome::Failed { .. } => None,
            })
            .collect::<Vec<_>>()
            .join(PAGE_DIVIDER)
    }

    /// Number of pages whose extraction failed.
    pub fn failed_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|outcome| matches!(outcome, PageOutcome::Failed { .. }))
            .count()
    }
}

/// Renders a PDF and transcribes its pages.
///
/// No retries: a failed page stays skipped for this run.
pub struct OcrPipeline {
    renderer: Arc<dyn PageRenderer>,
    extractor: Arc<dyn VisionExtractor>,
    dpi: u32,
    page_concurrency: usize,
}

impl OcrPipeline {
    /// Build a pipeline rendering at [`DEFAULT_RENDER_DPI`].
    pub fn new(renderer: Arc<dyn PageRenderer>, extractor: Arc<dyn VisionExtractor>) -> Self {
        Self {
            renderer,
            extractor,
            dpi: DEFAULT_RENDER_DPI,
            page_concurrency: DEFAULT_PAGE_CONCURRENCY,
        }
    }

    /// Override the raster resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.max(1);
        self
    }

    /// Number of pages transcribed concurrently; output order is unaffected.
    pub fn with_page_concurrency(mut self, concurrency: usize) -> Self {
        self.page_concurrency = concurrency.max(1);
        self
    }

    /// Render and transcribe every page of `pdf`.
    ///
    /// Fails with [`OcrError::EmptyDocument`] when no page could be rasterized and propagates
    /// document-level render errors (unreadable PDF, missing library).
    pub async fn extract_document(&self, pdf: Vec<u8>) -> Result<OcrDocument, OcrError> {
        let images = self.render_pages(pdf).await?;
        if images.is_empty() {
            return Err(OcrError::EmptyDocument);
        }

        let extractor = &self.extractor;
        let pages = stream::iter(images)
            .map(|(page, png)| async move {
                match extractor.extract(&png).await {
                    Ok(text) => PageOutcome::Text { page, text },
                    Err(err) => {
                        tracing::warn!(page, error = %err, "Page extraction failed; skipping");
                        PageOutcome::Failed {
                            page,
                            reason: err.to_string(),
                        }
                    }
                }
            })
            .buffered(self.page_concurrency)
            .collect()
            .await;

        Ok(OcrDocument { pages })
    }

    async fn render_pages(&self, pdf: Vec<u8>) -> Result<Vec<(usize, Vec<u8>)>, OcrError> {
        let renderer = Arc::clone(&self.renderer);
        let dpi = self.dpi;
        tokio::task::spawn_blocking(move || {
            let rendered = renderer.render_pages(&pdf, dpi)?;
            let count = rendered.len();
            let mut images = Vec::with_capacity(count);
            for (page, result) in rendered.into_iter().enumerate() {
                match result {
                    Ok(png) => images.push((page, png)),
                    Err(err) => tracing::warn!(page, error = %err, "Page render failed; skipping"),
                }
            }
            tracing::debug!(pages = count, rendered = images.len(), dpi, "Rendered PDF pages");
            Ok(images)
        })
        .await
        .map_err(|err| OcrError::Render {
            page: 0,
            reason: format!("render task failed: {err}"),
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::RenderedPage;
    use crate::test_support::{ScriptedExtractor, ScriptedRenderer};

    fn pipeline(pages: Vec<Option<&[u8]>>, texts: &[(&[u8], &str)]) -> OcrPipeline {
        let renderer = ScriptedRenderer {
            pages: pages.into_iter().map(|p| p.map(<[u8]>::to_vec)).collect(),
        };
        let extractor = ScriptedExtractor {
            texts: texts
                .iter()
                .map(|(png, text)| (png.to_vec(), text.to_string()))
                .collect(),
        };
        OcrPipeline::new(Arc::new(renderer), Arc::new(extractor)).with_page_concurrency(2)
    }

    #[tokio::test]
    async fn joins_pages_in_order_and_skips_failures() {
        let pipeline = pipeline(
            vec![Some(b"p0"), Some(b"p1"), Some(b"p2")],
            &[(b"p0", "Seite eins"), (b"p2", "Seite drei")],
        );

        let document = pipeline
            .extract_document(b"%PDF-1.7".to_vec())
            .await
            .expect("document");

        assert_eq!(document.text(), format!("Seite eins{PAGE_DIVIDER}Seite drei"));
        assert_eq!(document.failed_pages(), 1);
        assert_eq!(
            document.pages[1],
            PageOutcome::Failed {
                page: 1,
                reason: "Vision extraction failed: model timeout".into()
            }
        );
    }

    #[tokio::test]
    async fn unrenderable_pages_are_skipped() {
        let pipeline = pipeline(vec![None, Some(b"p1")], &[(b"p1", "nur Seite zwei")]);
        let document = pipeline
            .extract_document(b"%PDF-1.4".to_vec())
            .await
            .expect("document");
        assert_eq!(document.text(), "nur Seite zwei");
        assert_eq!(document.pages.len(), 1);
    }

    #[tokio::test]
    async fn all_extractions_failing_yields_empty_text() {
        let pipeline = pipeline(vec![Some(b"p0"), Some(b"p1")], &[]);
        let document = pipeline
            .extract_document(b"%PDF-1.4".to_vec())
            .await
            .expect("document");
        assert_eq!(document.text(), "");
        assert_eq!(document.failed_pages(), 2);
    }

    #[tokio::test]
    async fn no_rendered_pages_is_an_empty_document() {
        let unrenderable = pipeline(vec![None, None], &[]);
        let err = unrenderable
            .extract_document(b"%PDF-1.4".to_vec())
            .await
            .expect_err("empty");
        assert!(matches!(err, OcrError::EmptyDocument));

        let pageless = pipeline(vec![], &[]);
        let err = pageless
            .extract_document(b"%PDF-1.4".to_vec())
            .await
            .expect_err("empty");
        assert!(matches!(err, OcrError::EmptyDocument));
    }

    struct CountingRenderer {
        calls: std::sync::atomic::AtomicUsize,
        pages: usize,
    }

    impl PageRenderer for CountingRenderer {
        fn render_pages(&self, _pdf: &[u8], _dpi: u32) -> Result<Vec<RenderedPage>, OcrError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok((0..self.pages).map(|page| Ok(vec![page as u8])).collect())
        }
    }

    #[tokio::test]
    async fn long_documents_are_rendered_in_one_pass() {
        let renderer = Arc::new(CountingRenderer {
            calls: std::sync::atomic::AtomicUsize::new(0),
            pages: 40,
        });
        let texts = (0..40u8).map(|page| (vec![page], format!("Seite {page}")));
        let extractor = ScriptedExtractor {
            texts: texts.collect(),
        };
        let pipeline = OcrPipeline::new(
            Arc::clone(&renderer) as Arc<dyn PageRenderer>,
            Arc::new(extractor),
        );

        let document = pipeline
            .extract_document(b"%PDF-1.7".to_vec())
            .await
            .expect("document");

        assert_eq!(renderer.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(document.pages.len(), 40);
        assert_eq!(document.failed_pages(), 0);
    }

    #[tokio::test]
    async fn unreadable_documents_propagate_render_errors() {
        let pipeline = pipeline(vec![Some(b"p0")], &[]);
        let err = pipeline
            .extract_document(b"not a pdf".to_vec())
            .await
            .expect_err("render");
        assert!(matches!(err, OcrError::Render { page: 0, .. }));
    }
}
