use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Workflow state of a match as seen by the company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Freshly computed.
    New,
}

/// The three signals behind a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchSignals {
    /// Cosine-derived similarity in `[0, 1]`.
    pub vector_score: f64,
    /// Share of tender codes covered by the company tags.
    pub cpv_score: f64,
    /// Distance bucket score.
    pub geo_score: f64,
    /// Company-to-tender distance when both locations are known.
    pub distance_km: Option<f64>,
    /// Tender lies inside the company's service radius.
    pub within_radius: bool,
}

/// Tender fields carried with a match so callers can render a feed without another lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenderSummary {
    /// Tender title.
    pub title: String,
    /// Submission deadline.
    #[serde(with = "time::serde::rfc3339")]
    pub deadline_at: OffsetDateTime,
    /// City of performance.
    pub city: Option<String>,
    /// Awarding authority.
    pub authority_name: Option<String>,
}

/// Ephemeral ranking result produced per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Random identity of this result.
    pub id: Uuid,
    /// Company the ranking was computed for.
    pub company_id: Uuid,
    /// Ranked tender.
    pub tender_id: Uuid,
    /// Composite score in `[0, 1]`.
    pub score: f64,
    /// Human-readable justification.
    pub reason: String,
    /// Always [`MatchStatus::New`] on creation.
    pub status: MatchStatus,
    /// Individual signals.
    pub signals: MatchSignals,
    /// Display fields of the tender.
    pub tender: TenderSummary,
}
