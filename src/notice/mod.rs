//! Structured notice parser for eForms/UBL contract notices.
//!
//! Parsing happens in three stages:
//!
//! 1. a root-element gate that only reads the first start tag, so award and prior-information
//!    notices are rejected before any decoding work;
//! 2. a schema-tolerant decode into [`schema::ContractNotice`] where absent elements are empty;
//! 3. per-field fallback chains ([`extract`]) assembling the canonical [`Tender`].
//!
//! Persistence (upsert by external identifier) is left to the ingestion service.

mod dates;
mod extract;
mod schema;
mod tree;

use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::{ProcessingStatus, SourceKind, Tender};
use extract::{first_non_empty, merge_unique, split_postal_city};
use schema::ContractNotice;

/// Root element accepted by the parser.
pub const CONTRACT_NOTICE: &str = "ContractNotice";

const UNTITLED_NOTICE: &str = "Untitled tender";

/// Errors raised while gating or decoding a notice.
#[derive(Debug, Error)]
pub enum NoticeError {
    /// Recognised notice kind that does not describe an open tender.
    #[error("{root} is not supported: {reason}. Only ContractNotice documents can be uploaded")]
    UnsupportedNoticeType {
        /// Root element of the rejected document.
        root: String,
        /// Why the notice kind is rejected.
        reason: &'static str,
    },
    /// Root element is not a known notice kind.
    #[error("Unknown notice type <{0}>; expected ContractNotice")]
    UnknownNoticeType(String),
    /// Document is not well-formed XML.
    #[error("Malformed notice XML: {0}")]
    Parse(String),
}

/// Inspect only the root element and reject anything but a contract notice.
pub fn check_notice_type(xml: &[u8]) -> Result<(), NoticeError> {
    let root = tree::root_name(xml)?;
    match root.as_str() {
        CONTRACT_NOTICE => Ok(()),
        "ContractAwardNotice" => Err(NoticeError::UnsupportedNoticeType {
            root,
            reason: "the contract has already been awarded",
        }),
        "PriorInformationNotice" => Err(NoticeError::UnsupportedNoticeType {
            root,
            reason: "it only announces a future procurement",
        }),
        _ => Err(NoticeError::UnknownNoticeType(root)),
    }
}

/// Parse a contract notice into a canonical `parsed` tender.
///
/// The returned record carries a fresh identity; callers resolve the stored identity through
/// [`Tender::external_id`]. `now` anchors the deadline fallback horizon.
pub fn parse_notice(xml: &[u8], now: OffsetDateTime) -> Result<Tender, NoticeError> {
    check_notice_type(xml)?;
    let root = tree::parse_document(xml)?;
    let notice = ContractNotice::from_root(&root);
    Ok(assemble(&notice, now))
}

fn assemble(notice: &ContractNotice, now: OffsetDateTime) -> Tender {
    let deadline = first_non_empty(notice, extract::DEADLINE);
    let title = first_non_empty(notice, extract::TITLE).unwrap_or_else(|| UNTITLED_NOTICE.into());

    let mut tender = Tender::new(
        SourceKind::EformsXml,
        title,
        dates::resolve_deadline(deadline.as_ref(), now),
    );

    let description = first_non_empty(notice, extract::DESCRIPTION).unwrap_or_default();
    tender.description_full = match first_non_empty(notice, extract::LOT_NAME) {
        Some(lot_name) => format!("{description}\n\nLot: {lot_name}"),
        None => description.clone(),
    };
    tender.ocr_text = description.clone();
    tender.description = description;

    tender.external_id = first_non_empty(notice, extract::EXTERNAL_ID);
    tender.source_url = first_non_empty(notice, extract::SOURCE_URL);
    tender.cpv_codes = merge_unique(notice, extract::CPV_SOURCES);
    tender.nuts_codes = merge_unique(notice, extract::NUTS_SOURCES);
    tender.procedure_type = first_non_empty(notice, extract::PROCEDURE_TYPE);
    tender.award_criteria = first_non_empty(notice, extract::AWARD_CRITERIA);
    tender.published_at = dates::parse_published(&notice.issue_date);
    tender.authority_name = first_non_empty(notice, extract::AUTHORITY_NAME);
    tender.authority_address = first_non_empty(notice, extract::AUTHORITY_ADDRESS);

    tender.location.postal_code = first_non_empty(notice, extract::POSTAL_CODE);
    let (split_code, split_city) = first_non_empty(notice, extract::CITY)
        .map(|city| split_postal_city(&city))
        .unwrap_or_default();
    if tender.location.postal_code.is_none() {
        tender.location.postal_code = split_code;
    }
    tender.location.city = split_city;

    tender.processing_status = ProcessingStatus::Parsed;
    tender.scraped_at = Some(now);
    tender
}
