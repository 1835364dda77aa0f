//! Payload filter builders for Qdrant queries.

use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Exact match on a keyword payload field.
pub fn keyword_match(field: &str, value: &str) -> Value {
    json!({
        "must": [
            { "key": field, "match": { "value": value } }
        ]
    })
}

/// Records whose `deadline_at` lies strictly after `now`.
///
/// Falls back to an empty filter if `now` cannot be formatted, which only happens for years
/// outside RFC 3339.
pub fn open_deadline(now: OffsetDateTime) -> Value {
    match now.format(&Rfc3339) {
        Ok(timestamp) => json!({
            "must": [
                { "key": "deadline_at", "range": { "gt": timestamp } }
            ]
        }),
        Err(err) => {
            tracing::warn!(error = %err, "Could not format deadline filter; scanning all tenders");
            json!({ "must": [] })
        }
    }
}
