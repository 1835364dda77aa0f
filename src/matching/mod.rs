//! Hybrid matching: embedding similarity, category overlap and distance combined into one
//! ranked feed per company.

mod score;
mod service;

use thiserror::Error;
use uuid::Uuid;

use crate::app::ErrorKind;
use crate::store::StoreError;

pub use score::{
    CPV_WEIGHT, DEFAULT_MATCH_LIMIT, GEO_WEIGHT, UNKNOWN_LOCATION_SCORE, VECTOR_WEIGHT,
    composite_score, cpv_score, effective_limit, geo_score, passes_filter, reason, signals,
    vector_score,
};
pub use service::MatchingService;

/// Errors raised by [`MatchingService::find_matches`].
#[derive(Debug, Error)]
pub enum MatchError {
    /// The owner has no company profile.
    #[error("No company profile for owner {0}")]
    CompanyNotFound(Uuid),
    /// Loading the profile or candidates failed.
    #[error("Match query failed: {0}")]
    MatchQueryFailed(#[from] StoreError),
}

impl MatchError {
    /// Category used for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CompanyNotFound(_) => ErrorKind::NotFound,
            Self::MatchQueryFailed(_) => ErrorKind::Persistence,
        }
    }
}
