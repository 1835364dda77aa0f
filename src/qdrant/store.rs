use async_trait::async_trait;
use futures_util::{StreamExt, pin_mut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use super::client::{QdrantClient, stringify_point_id};
use super::filters::{keyword_match, open_deadline};
use super::scroller::stream_points;
use super::types::{CONTENT_VECTOR, PROFILE_VECTOR, QdrantError, REQUIREMENT_VECTOR, StoredPoint};
use crate::config::Config;
use crate::domain::{Company, ProcessingStatus, Tender, TenderAttachment};
use crate::store::{StoreError, TenderStore};

/// Collection names used by [`QdrantStore`].
#[derive(Debug, Clone)]
pub struct Collections {
    /// Tender collection.
    pub tenders: String,
    /// Company collection.
    pub companies: String,
    /// Attachment collection.
    pub attachments: String,
}

impl Collections {
    /// Names from `*_COLLECTION_NAME`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            tenders: config.tender_collection_name.clone(),
            companies: config.company_collection_name.clone(),
            attachments: config.attachment_collection_name.clone(),
        }
    }
}

/// [`TenderStore`] keeping each record as a point payload plus one named vector.
pub struct QdrantStore {
    client: QdrantClient,
    collections: Collections,
}

impl QdrantStore {
    /// Store over `client` using `collections`.
    pub fn new(client: QdrantClient, collections: Collections) -> Self {
        Self {
            client,
            collections,
        }
    }

    /// Create missing collections and payload indexes.
    pub async fn ensure_schema(&self, dimension: usize) -> Result<(), QdrantError> {
        let c = &self.collections;
        self.client
            .ensure_collection(&c.tenders, REQUIREMENT_VECTOR, dimension)
            .await?;
        self.client
            .ensure_payload_indexes(
                &c.tenders,
                &[("external_id", "keyword"), ("deadline_at", "datetime")],
            )
            .await?;

        self.client
            .ensure_collection(&c.companies, PROFILE_VECTOR, dimension)
            .await?;
        self.client
            .ensure_payload_indexes(&c.companies, &[("owner_id", "keyword")])
            .await?;

        self.client
            .ensure_collection(&c.attachments, CONTENT_VECTOR, dimension)
            .await?;
        self.client
            .ensure_payload_indexes(&c.attachments, &[("tender_id", "keyword")])
            .await
    }
}

fn payload<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(record)?)
}

fn decode<T: DeserializeOwned>(point: &StoredPoint) -> Result<T, StoreError> {
    let payload = point.payload.clone().unwrap_or_default();
    serde_json::from_value(Value::Object(payload)).map_err(|err| {
        let id = point.id.as_ref().map(stringify_point_id).unwrap_or_default();
        tracing::error!(point_id = %id, error = %err, "Stored payload does not decode");
        StoreError::Serialization(err)
    })
}

fn decode_tender(point: StoredPoint) -> Result<Tender, StoreError> {
    let mut tender: Tender = decode(&point)?;
    tender.requirement_embedding = point.named_vector(REQUIREMENT_VECTOR);
    Ok(tender)
}

fn decode_company(point: StoredPoint) -> Result<Company, StoreError> {
    let mut company: Company = decode(&point)?;
    company.profile_embedding = point.named_vector(PROFILE_VECTOR);
    Ok(company)
}

fn decode_attachment(point: StoredPoint) -> Result<TenderAttachment, StoreError> {
    let mut attachment: TenderAttachment = decode(&point)?;
    attachment.content_embedding = point.named_vector(CONTENT_VECTOR);
    Ok(attachment)
}

fn timestamp(now: OffsetDateTime) -> Value {
    now.format(&Rfc3339).map(Value::String).unwrap_or(Value::Null)
}

#[async_trait]
impl TenderStore for QdrantStore {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Tender>, StoreError> {
        let points = self
            .client
            .scroll_page(
                &self.collections.tenders,
                keyword_match("external_id", external_id),
                1,
                Some(REQUIREMENT_VECTOR),
            )
            .await?;
        points.into_iter().next().map(decode_tender).transpose()
    }

    async fn get_tender(&self, id: Uuid) -> Result<Option<Tender>, StoreError> {
        let points = self
            .client
            .retrieve(&self.collections.tenders, &[id], Some(REQUIREMENT_VECTOR))
            .await?;
        points.into_iter().next().map(decode_tender).transpose()
    }

    async fn upsert(&self, tender: Tender) -> Result<Tender, StoreError> {
        let vector = tender
            .requirement_embedding
            .as_deref()
            .map(|values| (REQUIREMENT_VECTOR, values));
        self.client
            .upsert_point(&self.collections.tenders, tender.id, payload(&tender)?, vector)
            .await?;
        Ok(tender)
    }

    async fn update_embedding(&self, id: Uuid, embedding: Vec<f32>) -> Result<(), StoreError> {
        let operations = vec![
            json!({
                "update_vectors": {
                    "points": [{ "id": id.to_string(), "vector": { REQUIREMENT_VECTOR: embedding } }]
                }
            }),
            json!({
                "set_payload": {
                    "payload": {
                        "processing_status": ProcessingStatus::Ready,
                        "updated_at": timestamp(OffsetDateTime::now_utc()),
                    },
                    "points": [id.to_string()]
                }
            }),
        ];
        self.client
            .batch_update(&self.collections.tenders, operations)
            .await?;
        Ok(())
    }

    async fn find_company_by_owner(&self, owner_id: Uuid) -> Result<Option<Company>, StoreError> {
        let points = self
            .client
            .scroll_page(
                &self.collections.companies,
                keyword_match("owner_id", &owner_id.to_string()),
                1,
                Some(PROFILE_VECTOR),
            )
            .await?;
        points.into_iter().next().map(decode_company).transpose()
    }

    async fn upsert_company(&self, company: Company) -> Result<Company, StoreError> {
        let vector = company
            .profile_embedding
            .as_deref()
            .map(|values| (PROFILE_VECTOR, values));
        self.client
            .upsert_point(
                &self.collections.companies,
                company.id,
                payload(&company)?,
                vector,
            )
            .await?;
        Ok(company)
    }

    async fn query_candidate_tenders(
        &self,
        company: &Company,
        now: OffsetDateTime,
    ) -> Result<Vec<Tender>, StoreError> {
        let stream = stream_points(
            &self.client,
            &self.collections.tenders,
            open_deadline(now),
            Some(REQUIREMENT_VECTOR),
        );
        pin_mut!(stream);

        let mut tenders = Vec::new();
        while let Some(point) = stream.next().await {
            tenders.push(decode_tender(point?)?);
        }
        tracing::debug!(company_id = %company.id, candidates = tenders.len(), "Loaded candidate tenders");
        Ok(tenders)
    }

    async fn insert_attachment(&self, attachment: TenderAttachment) -> Result<(), StoreError> {
        self.client
            .upsert_point(
                &self.collections.attachments,
                attachment.id,
                payload(&attachment)?,
                None,
            )
            .await?;
        Ok(())
    }

    async fn get_attachment(&self, id: Uuid) -> Result<Option<TenderAttachment>, StoreError> {
        let points = self
            .client
            .retrieve(&self.collections.attachments, &[id], Some(CONTENT_VECTOR))
            .await?;
        points.into_iter().next().map(decode_attachment).transpose()
    }

    async fn record_attachment_ocr(
        &self,
        id: Uuid,
        content: String,
        embedding: Option<Vec<f32>>,
    ) -> Result<(), StoreError> {
        let mut operations = Vec::with_capacity(2);
        if let Some(vector) = embedding {
            operations.push(json!({
                "update_vectors": {
                    "points": [{ "id": id.to_string(), "vector": { CONTENT_VECTOR: vector } }]
                }
            }));
        }
        operations.push(json!({
            "set_payload": {
                "payload": { "content_ocr": content, "ocr_processed": true },
                "points": [id.to_string()]
            }
        }));
        self.client
            .batch_update(&self.collections.attachments, operations)
            .await?;
        Ok(())
    }
}
