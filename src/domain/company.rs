use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::GeoPoint;

/// Service radius applied when a profile does not set one.
pub const DEFAULT_SERVICE_RADIUS_KM: f64 = 100.0;

/// Country assumed for addresses without one.
pub const DEFAULT_COUNTRY: &str = "DE";

/// Postal address of a company.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyAddress {
    /// Street and house number.
    #[serde(default)]
    pub street: Option<String>,
    /// Postal code.
    #[serde(default)]
    pub postal_code: Option<String>,
    /// City.
    #[serde(default)]
    pub city: Option<String>,
    /// ISO country code.
    #[serde(default)]
    pub country: Option<String>,
}

/// Capability profile used as the query side of matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    /// Store identity.
    pub id: Uuid,
    /// Account that owns the profile; one profile per owner.
    pub owner_id: Uuid,
    /// Company name.
    pub name: String,
    /// Free-text industry description.
    #[serde(default)]
    pub industry: Option<String>,
    /// Category codes the company can deliver; compared with tender CPV codes.
    #[serde(default)]
    pub category_tags: Vec<String>,
    /// Postal address.
    #[serde(default)]
    pub address: CompanyAddress,
    /// Geocoded address.
    #[serde(default)]
    pub location: Option<GeoPoint>,
    /// Maximum travel distance in kilometers.
    #[serde(default)]
    pub service_radius_km: Option<f64>,
    /// Free-text capability summary.
    #[serde(default)]
    pub profile_summary: String,
    /// Reference projects, stored opaquely.
    #[serde(default)]
    pub references: Value,
    /// Owner settings, stored opaquely.
    #[serde(default)]
    pub settings: Value,
    /// Profile embedding, same dimensionality as tender embeddings.
    #[serde(skip)]
    pub profile_embedding: Option<Vec<f32>>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Company {
    /// Radius used for matching, falling back to [`DEFAULT_SERVICE_RADIUS_KM`].
    pub fn effective_radius_km(&self) -> f64 {
        self.service_radius_km
            .filter(|radius| radius.is_finite() && *radius > 0.0)
            .unwrap_or(DEFAULT_SERVICE_RADIUS_KM)
    }

    /// Text sent to the embedding service for this profile.
    pub fn embedding_text(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            self.name,
            self.industry.as_deref().unwrap_or_default(),
            self.category_tags.join(" "),
            self.profile_summary
        )
    }
}
