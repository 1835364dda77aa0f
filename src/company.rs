//! Company profile maintenance.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::ErrorKind;
use crate::domain::{Company, CompanyAddress, DEFAULT_COUNTRY, append_unique};
use crate::embedding::{EmbeddingClient, EmbeddingError, embed_one};
use crate::geocoding::{Geocoder, GeocodingError};
use crate::store::{StoreError, TenderStore};

/// Errors raised while saving a company profile.
#[derive(Debug, Error)]
pub enum CompanyError {
    /// The profile has no name.
    #[error("Company name must not be empty")]
    MissingName,
    /// Embedding service failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// Geocoding service failed.
    #[error(transparent)]
    Geocoding(#[from] GeocodingError),
    /// Store read or write failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CompanyError {
    /// Category used for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingName => ErrorKind::Validation,
            Self::Embedding(_) | Self::Geocoding(_) => ErrorKind::ExternalService,
            Self::Store(_) => ErrorKind::Persistence,
        }
    }
}

/// Caller-editable part of a company profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyInput {
    /// Company name.
    pub name: String,
    /// Free-text industry.
    #[serde(default)]
    pub industry: Option<String>,
    /// Category codes the company delivers.
    #[serde(default)]
    pub category_tags: Vec<String>,
    /// Postal address.
    #[serde(default)]
    pub address: CompanyAddress,
    /// Travel radius in kilometers.
    #[serde(default)]
    pub service_radius_km: Option<f64>,
    /// Capability summary.
    #[serde(default)]
    pub profile_summary: String,
    /// Reference projects.
    #[serde(default)]
    pub references: Value,
    /// Owner settings.
    #[serde(default)]
    pub settings: Value,
}

/// Saves company profiles with their embedding and coordinates.
pub struct CompanyService {
    store: Arc<dyn TenderStore>,
    embedder: Arc<dyn EmbeddingClient>,
    geocoder: Arc<dyn Geocoder>,
    dimension: usize,
}

impl CompanyService {
    /// Service over the given collaborators.
    pub fn new(
        store: Arc<dyn TenderStore>,
        embedder: Arc<dyn EmbeddingClient>,
        geocoder: Arc<dyn Geocoder>,
        dimension: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            geocoder,
            dimension,
        }
    }

    /// Create or replace the profile owned by `owner_id`, keeping an existing identity.
    pub async fn upsert_company(
        &self,
        owner_id: Uuid,
        input: CompanyInput,
    ) -> Result<Company, CompanyError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(CompanyError::MissingName);
        }

        let mut tags = Vec::with_capacity(input.category_tags.len());
        for tag in &input.category_tags {
            append_unique(&mut tags, tag);
        }

        let mut address = input.address;
        if address.country.as_deref().is_none_or(|c| c.trim().is_empty()) {
            address.country = Some(DEFAULT_COUNTRY.to_string());
        }

        let now = OffsetDateTime::now_utc();
        let existing = self.store.find_company_by_owner(owner_id).await?;
        let mut company = Company {
            id: existing.as_ref().map_or_else(Uuid::new_v4, |c| c.id),
            owner_id,
            name: name.to_string(),
            industry: input.industry,
            category_tags: tags,
            address,
            location: None,
            service_radius_km: input.service_radius_km,
            profile_summary: input.profile_summary,
            references: input.references,
            settings: input.settings,
            profile_embedding: None,
            created_at: existing.as_ref().map_or(now, |c| c.created_at),
            updated_at: now,
        };
        company.service_radius_km = Some(company.effective_radius_km());

        if company.address.postal_code.is_some() || company.address.city.is_some() {
            company.location = self
                .geocoder
                .geocode(
                    company.address.postal_code.as_deref(),
                    company.address.city.as_deref(),
                    company.address.country.as_deref(),
                )
                .await?;
        }

        company.profile_embedding = Some(
            embed_one(
                self.embedder.as_ref(),
                company.embedding_text(),
                self.dimension,
            )
            .await?,
        );

        let company = self.store.upsert_company(company).await?;
        tracing::info!(
            %owner_id,
            company_id = %company.id,
            located = company.location.is_some(),
            updated = existing.is_some(),
            "Company profile saved"
        );
        Ok(company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_SERVICE_RADIUS_KM, GeoPoint};
    use crate::embedding::HashingEmbeddingClient;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGeocoder {
        calls: Mutex<Vec<(Option<String>, Option<String>, Option<String>)>>,
    }

    #[async_trait]
    impl Geocoder for RecordingGeocoder {
        async fn geocode(
            &self,
            postal_code: Option<&str>,
            city: Option<&str>,
            country: Option<&str>,
        ) -> Result<Option<GeoPoint>, GeocodingError> {
            self.calls.lock().expect("lock").push((
                postal_code.map(str::to_string),
                city.map(str::to_string),
                country.map(str::to_string),
            ));
            Ok(Some(GeoPoint::new(53.55, 9.99)))
        }
    }

    fn input() -> CompanyInput {
        CompanyInput {
            name: "Hafenbau Hamburg".into(),
            industry: Some("Wasserbau".into()),
            category_tags: vec!["45240000".into(), "45240000".into(), "45241000".into()],
            address: CompanyAddress {
                postal_code: Some("20457".into()),
                city: Some("Hamburg".into()),
                ..CompanyAddress::default()
            },
            ..CompanyInput::default()
        }
    }

    #[tokio::test]
    async fn saves_with_defaults_and_keeps_identity() {
        let store = Arc::new(MemoryStore::new());
        let geocoder = Arc::new(RecordingGeocoder::default());
        let service = CompanyService::new(
            store.clone(),
            Arc::new(HashingEmbeddingClient::new(8)),
            geocoder.clone(),
            8,
        );
        let owner = Uuid::new_v4();

        let first = service.upsert_company(owner, input()).await.expect("first");
        assert_eq!(first.service_radius_km, Some(DEFAULT_SERVICE_RADIUS_KM));
        assert_eq!(first.category_tags, vec!["45240000", "45241000"]);
        assert_eq!(first.location, Some(GeoPoint::new(53.55, 9.99)));
        assert_eq!(first.profile_embedding.as_ref().map(Vec::len), Some(8));
        assert_eq!(
            geocoder.calls.lock().expect("lock")[0],
            (
                Some("20457".to_string()),
                Some("Hamburg".to_string()),
                Some("DE".to_string())
            )
        );

        let second = service
            .upsert_company(
                owner,
                CompanyInput {
                    service_radius_km: Some(250.0),
                    ..input()
                },
            )
            .await
            .expect("second");
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.service_radius_km, Some(250.0));
        let stored = store
            .find_company_by_owner(owner)
            .await
            .expect("load")
            .expect("company");
        assert_eq!(stored.service_radius_km, Some(250.0));
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let service = CompanyService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(HashingEmbeddingClient::new(8)),
            Arc::new(RecordingGeocoder::default()),
            8,
        );
        let err = service
            .upsert_company(
                Uuid::new_v4(),
                CompanyInput {
                    name: "  ".into(),
                    ..input()
                },
            )
            .await
            .expect_err("blank");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
