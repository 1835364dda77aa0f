//! Bid feasibility checks delegated to a chat model.

mod agent;
mod service;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::app::ErrorKind;
use crate::store::StoreError;

pub use agent::{ChatComplianceAgent, SUBMIT_TOOL};
pub use service::{ComplianceService, profile_summary};

/// Errors raised by compliance checks.
#[derive(Debug, Error)]
pub enum ComplianceError {
    /// The owner has no company profile.
    #[error("No company profile for owner {0}")]
    CompanyNotFound(Uuid),
    /// The tender does not exist.
    #[error("Tender {0} not found")]
    TenderNotFound(Uuid),
    /// The agent could not be reached or gave no usable verdict.
    #[error("Compliance agent failed: {0}")]
    Agent(String),
    /// Store read failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ComplianceError {
    /// Category used for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CompanyNotFound(_) | Self::TenderNotFound(_) => ErrorKind::NotFound,
            Self::Agent(_) => ErrorKind::ExternalService,
            Self::Store(_) => ErrorKind::Persistence,
        }
    }
}

impl From<reqwest::Error> for ComplianceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Agent(err.to_string())
    }
}

/// What the agent reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceInput {
    /// Tender text.
    pub ocr_text: String,
    /// One-line company description.
    pub profile_summary: String,
}

/// Verdict the agent must submit through its tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ComplianceAssessment {
    /// Whether a bid is feasible.
    pub is_feasible: bool,
    /// Missing documents or knock-out criteria.
    #[serde(default)]
    pub blockers: Vec<String>,
}

/// Assesses a tender against a company profile.
#[async_trait]
pub trait ComplianceAgent: Send + Sync {
    /// Feasibility verdict for `input`.
    async fn assess(&self, input: &ComplianceInput) -> Result<ComplianceAssessment, ComplianceError>;
}
