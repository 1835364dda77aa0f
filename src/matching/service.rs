use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use super::MatchError;
use super::score::{composite_score, effective_limit, passes_filter, rank, reason, signals};
use crate::domain::{Match, MatchStatus, TenderSummary};
use crate::metrics::IngestionMetrics;
use crate::store::TenderStore;

/// Ranks open tenders for a company.
#[derive(Clone)]
pub struct MatchingService {
    store: Arc<dyn TenderStore>,
    metrics: Arc<IngestionMetrics>,
}

impl MatchingService {
    /// Service reading from `store`.
    pub fn new(store: Arc<dyn TenderStore>, metrics: Arc<IngestionMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Ranked matches for the company owned by `owner_id`.
    ///
    /// Every call recomputes the signals from stored values. `limit` of `None` or below one
    /// returns up to 20 matches.
    pub async fn find_matches(
        &self,
        owner_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Match>, MatchError> {
        self.find_matches_at(owner_id, limit, OffsetDateTime::now_utc())
            .await
    }

    pub(crate) async fn find_matches_at(
        &self,
        owner_id: Uuid,
        limit: Option<i64>,
        now: OffsetDateTime,
    ) -> Result<Vec<Match>, MatchError> {
        let company = self
            .store
            .find_company_by_owner(owner_id)
            .await?
            .ok_or(MatchError::CompanyNotFound(owner_id))?;
        let candidates = self.store.query_candidate_tenders(&company, now).await?;
        let considered = candidates.len();

        let mut scored: Vec<_> = candidates
            .into_iter()
            .filter_map(|tender| {
                let signals = signals(&company, &tender);
                passes_filter(&signals).then(|| {
                    let score = composite_score(
                        signals.vector_score,
                        signals.cpv_score,
                        signals.geo_score,
                    );
                    (tender, signals, score)
                })
            })
            .collect();

        scored.sort_by(|a, b| rank((&a.1, a.2), (&b.1, b.2)).then_with(|| a.0.id.cmp(&b.0.id)));
        scored.truncate(effective_limit(limit));

        let matches: Vec<Match> = scored
            .into_iter()
            .map(|(tender, signals, score)| Match {
                id: Uuid::new_v4(),
                company_id: company.id,
                tender_id: tender.id,
                score,
                reason: reason(&signals),
                status: MatchStatus::New,
                signals,
                tender: TenderSummary {
                    title: tender.title,
                    deadline_at: tender.deadline_at,
                    city: tender.location.city,
                    authority_name: tender.authority_name,
                },
            })
            .collect();

        self.metrics.record_match_query();
        tracing::info!(
            %owner_id,
            company_id = %company.id,
            considered,
            returned = matches.len(),
            "Computed matches"
        );
        Ok(matches)
    }
}
