//! Per-field fallback chains over a decoded [`ContractNotice`].
//!
//! Each field is an ordered list of pure extractor functions; the first one returning a
//! non-empty value wins. Multi-valued fields (codes) merge every source instead.

use super::schema::{ContractNotice, DeadlinePeriod};
use crate::domain::append_unique;

type Extractor<T> = fn(&ContractNotice) -> Option<T>;
type MultiExtractor = fn(&ContractNotice) -> Vec<String>;

/// First non-empty result of `chain`.
pub(crate) fn first_non_empty<T>(notice: &ContractNotice, chain: &[Extractor<T>]) -> Option<T> {
    chain.iter().find_map(|extract| extract(notice))
}

/// Concatenate every source, dropping blanks and repeats while keeping first-seen order.
pub(crate) fn merge_unique(notice: &ContractNotice, sources: &[MultiExtractor]) -> Vec<String> {
    let mut merged = Vec::new();
    for source in sources {
        for code in source(notice) {
            append_unique(&mut merged, &code);
        }
    }
    merged
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub(crate) const EXTERNAL_ID: &[Extractor<String>] = &[
    |n| non_empty(&n.id),
    |n| non_empty(&n.contract_folder_id),
];

pub(crate) const TITLE: &[Extractor<String>] = &[
    |n| non_empty(&n.project.name),
    |n| non_empty(&n.lot.project.name),
];

pub(crate) const DESCRIPTION: &[Extractor<String>] = &[
    |n| non_empty(&n.project.description),
    |n| non_empty(&n.lot.project.description),
];

pub(crate) const LOT_NAME: &[Extractor<String>] = &[|n| non_empty(&n.lot.project.name)];

pub(crate) const DEADLINE: &[Extractor<DeadlinePeriod>] = &[
    |n| (!n.deadline.is_empty()).then(|| n.deadline.clone()),
    |n| (!n.lot.deadline.is_empty()).then(|| n.lot.deadline.clone()),
];

pub(crate) const AUTHORITY_NAME: &[Extractor<String>] = &[
    |n| n.organizations.first().and_then(|org| non_empty(&org.name)),
    |n| non_empty(&n.contracting_party_name),
];

pub(crate) const AUTHORITY_ADDRESS: &[Extractor<String>] = &[|n| {
    n.organizations
        .first()
        .and_then(|org| non_empty(&org.address.street))
}];

pub(crate) const POSTAL_CODE: &[Extractor<String>] = &[
    |n| {
        n.organizations
            .first()
            .and_then(|org| non_empty(&org.address.postal_zone))
    },
    |n| non_empty(&n.project.location.postal_zone),
];

pub(crate) const CITY: &[Extractor<String>] = &[
    |n| {
        n.organizations
            .first()
            .and_then(|org| non_empty(&org.address.city))
    },
    |n| non_empty(&n.project.location.city),
];

pub(crate) const SOURCE_URL: &[Extractor<String>] = &[
    |n| non_empty(&n.lot.document_uri),
    |n| {
        n.organizations
            .first()
            .and_then(|org| non_empty(&org.endpoint_id))
    },
];

pub(crate) const AWARD_CRITERIA: &[Extractor<String>] = &[
    |n| non_empty(&n.lot.award_criterion_name),
    |n| non_empty(&n.lot.award_criterion_type),
];

pub(crate) const PROCEDURE_TYPE: &[Extractor<String>] = &[
    |n| non_empty(&n.project.procurement_type),
    |n| non_empty(&n.lot.project.procurement_type),
];

/// Lot main, lot additional, project main, project additional.
pub(crate) const CPV_SOURCES: &[MultiExtractor] = &[
    |n| vec![n.lot.project.main_classification.clone()],
    |n| n.lot.project.additional_classifications.clone(),
    |n| vec![n.project.main_classification.clone()],
    |n| n.project.additional_classifications.clone(),
];

pub(crate) const NUTS_SOURCES: &[MultiExtractor] = &[
    |n| vec![n.project.location.country_subentity.clone()],
    |n| vec![n.lot.project.location.country_subentity.clone()],
];

/// Split `"84034 Landshut"` into postal code and city.
///
/// Returns `(None, Some(whole))` when the string does not start with a five-digit code.
pub(crate) fn split_postal_city(raw: &str) -> (Option<String>, Option<String>) {
    let raw = raw.trim();
    if raw.is_empty() {
        return (None, None);
    }
    if let Some((code, city)) = raw.split_once(' ') {
        let code = code.trim();
        let city = city.trim();
        if code.len() == 5 && code.bytes().all(|b| b.is_ascii_digit()) && !city.is_empty() {
            return (Some(code.to_string()), Some(city.to_string()));
        }
    }
    (None, Some(raw.to_string()))
}
