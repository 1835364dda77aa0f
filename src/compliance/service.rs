use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use super::{ComplianceAgent, ComplianceError, ComplianceInput};
use crate::domain::{Company, ComplianceCheck};
use crate::store::TenderStore;

/// One-line description of a company handed to the agent.
pub fn profile_summary(company: &Company) -> String {
    let references =
        serde_json::to_string(&company.references).unwrap_or_else(|_| "null".to_string());
    format!(
        "Company: {}, industry: [{}], references: {}",
        company.name,
        company.category_tags.join(", "),
        references
    )
}

/// Runs compliance checks for stored companies and tenders.
pub struct ComplianceService {
    store: Arc<dyn TenderStore>,
    agent: Arc<dyn ComplianceAgent>,
}

impl ComplianceService {
    /// Service reading from `store` and asking `agent`.
    pub fn new(store: Arc<dyn TenderStore>, agent: Arc<dyn ComplianceAgent>) -> Self {
        Self { store, agent }
    }

    /// Feasibility of `tender_id` for the company owned by `owner_id`. Verdicts are not stored.
    pub async fn check_compliance(
        &self,
        owner_id: Uuid,
        tender_id: Uuid,
    ) -> Result<ComplianceCheck, ComplianceError> {
        let company = self
            .store
            .find_company_by_owner(owner_id)
            .await?
            .ok_or(ComplianceError::CompanyNotFound(owner_id))?;
        let tender = self
            .store
            .get_tender(tender_id)
            .await?
            .ok_or(ComplianceError::TenderNotFound(tender_id))?;

        let input = ComplianceInput {
            ocr_text: tender.ocr_text,
            profile_summary: profile_summary(&company),
        };
        let assessment = self.agent.assess(&input).await?;

        tracing::info!(
            %tender_id,
            company_id = %company.id,
            feasible = assessment.is_feasible,
            blockers = assessment.blockers.len(),
            "Compliance check finished"
        );
        Ok(ComplianceCheck {
            id: Uuid::new_v4(),
            tender_id,
            company_id: company.id,
            is_feasible: assessment.is_feasible,
            missing_docs: assessment.blockers,
            checked_at: OffsetDateTime::now_utc(),
        })
    }
}
