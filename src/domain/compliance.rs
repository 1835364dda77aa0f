use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Feasibility verdict for one company and one tender. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    /// Random identity of this verdict.
    pub id: Uuid,
    /// Assessed tender.
    pub tender_id: Uuid,
    /// Assessed company.
    pub company_id: Uuid,
    /// Whether the company can bid.
    pub is_feasible: bool,
    /// Requirements the company does not meet.
    pub missing_docs: Vec<String>,
    /// When the agent answered.
    #[serde(with = "time::serde::rfc3339")]
    pub checked_at: OffsetDateTime,
}
