//! Fixtures shared by unit tests across modules.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{Company, CompanyAddress, GeoPoint};
use crate::ocr::{OcrError, PageRenderer, RenderedPage, VisionExtractor};

/// Civil-engineering company in Munich with no embedding.
pub(crate) fn company() -> Company {
    let now = OffsetDateTime::now_utc();
    Company {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        name: "Tiefbau Nord GmbH".into(),
        industry: Some("Tiefbau".into()),
        category_tags: vec!["45233120".into()],
        address: CompanyAddress {
            postal_code: Some("80331".into()),
            city: Some("München".into()),
            ..CompanyAddress::default()
        },
        location: Some(GeoPoint::new(48.137, 11.575)),
        service_radius_km: None,
        profile_summary: "Straßen- und Kanalbau".into(),
        references: serde_json::Value::Null,
        settings: serde_json::Value::Null,
        profile_embedding: None,
        created_at: now,
        updated_at: now,
    }
}

/// Renderer whose pages are scripted: `Some(png)` renders, `None` fails.
pub(crate) struct ScriptedRenderer {
    pub(crate) pages: Vec<Option<Vec<u8>>>,
}

impl PageRenderer for ScriptedRenderer {
    fn render_pages(&self, pdf: &[u8], _dpi: u32) -> Result<Vec<RenderedPage>, OcrError> {
        if !pdf.starts_with(b"%PDF") {
            return Err(OcrError::Render {
                page: 0,
                reason: "not a PDF".into(),
            });
        }
        Ok(self
            .pages
            .iter()
            .enumerate()
            .map(|(page, png)| {
                png.clone().ok_or(OcrError::Render {
                    page,
                    reason: "corrupt page".into(),
                })
            })
            .collect())
    }
}

/// Extractor mapping image bytes to text; unknown images fail.
pub(crate) struct ScriptedExtractor {
    pub(crate) texts: HashMap<Vec<u8>, String>,
}

#[async_trait]
impl VisionExtractor for ScriptedExtractor {
    async fn extract(&self, png: &[u8]) -> Result<String, OcrError> {
        self.texts
            .get(png)
            .cloned()
            .ok_or_else(|| OcrError::Extraction("model timeout".into()))
    }
}
