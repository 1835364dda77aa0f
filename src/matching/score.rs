//! Pure scoring functions behind [`super::MatchingService`].

use std::cmp::Ordering;

use crate::domain::{Company, GeoPoint, MatchSignals, Tender};

/// Weight of the embedding similarity in the composite score.
pub const VECTOR_WEIGHT: f64 = 0.5;
/// Weight of the category overlap.
pub const CPV_WEIGHT: f64 = 0.3;
/// Weight of the distance bucket.
pub const GEO_WEIGHT: f64 = 0.2;

/// Geo score when either side has no coordinates.
pub const UNKNOWN_LOCATION_SCORE: f64 = 0.3;

/// Result count used for a missing or non-positive limit.
pub const DEFAULT_MATCH_LIMIT: usize = 20;

/// Cosine similarity (`1 - cosine distance`) clamped to `[0, 1]`.
///
/// Missing, empty, zero-norm or differently sized vectors score 0.
pub fn vector_score(tender: Option<&[f32]>, company: Option<&[f32]>) -> f64 {
    let (Some(a), Some(b)) = (tender, company) else {
        return 0.0;
    };
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Share of tender codes that appear among the company tags.
pub fn cpv_score(tender_codes: &[String], company_tags: &[String]) -> f64 {
    if tender_codes.is_empty() {
        return 0.0;
    }
    let covered = tender_codes
        .iter()
        .filter(|code| company_tags.contains(code))
        .count();
    covered as f64 / tender_codes.len() as f64
}

/// Distance bucket score; `None` distance means a location is unknown.
pub fn geo_score(distance_km: Option<f64>, within_radius: bool) -> f64 {
    let Some(distance) = distance_km else {
        return UNKNOWN_LOCATION_SCORE;
    };
    if within_radius {
        1.0
    } else if distance <= 50.0 {
        0.8
    } else if distance <= 100.0 {
        0.6
    } else if distance <= 200.0 {
        0.4
    } else {
        0.2
    }
}

/// Weighted sum of the three signals.
pub fn composite_score(vector: f64, cpv: f64, geo: f64) -> f64 {
    VECTOR_WEIGHT * vector + CPV_WEIGHT * cpv + GEO_WEIGHT * geo
}

/// A tender stays a candidate when any single signal is strong.
pub fn passes_filter(signals: &MatchSignals) -> bool {
    signals.vector_score > 0.3 || signals.cpv_score > 0.2 || signals.geo_score > 0.5
}

/// Compute every signal for one tender against one company.
pub fn signals(company: &Company, tender: &Tender) -> MatchSignals {
    let distance_km = distance(company.location, tender.location.coordinates);
    let within_radius = distance_km.is_some_and(|d| d <= company.effective_radius_km());

    MatchSignals {
        vector_score: vector_score(
            tender.requirement_embedding.as_deref(),
            company.profile_embedding.as_deref(),
        ),
        cpv_score: cpv_score(&tender.cpv_codes, &company.category_tags),
        geo_score: geo_score(distance_km, within_radius),
        distance_km,
        within_radius,
    }
}

fn distance(company: Option<GeoPoint>, tender: Option<GeoPoint>) -> Option<f64> {
    Some(company?.distance_km(&tender?))
}

/// Human-readable justification; the first matching rule wins.
pub fn reason(signals: &MatchSignals) -> String {
    let distance = signals.distance_km;
    if signals.within_radius && signals.vector_score > 0.7 {
        "Perfect match nearby".to_string()
    } else if signals.vector_score > 0.8 {
        "Excellent content match".to_string()
    } else if signals.cpv_score > 0.6 {
        "Strong category match".to_string()
    } else if let (true, Some(km)) = (signals.within_radius, distance) {
        format!("Within your service radius ({km:.1} km)")
    } else if let Some(km) = distance.filter(|km| *km < 50.0) {
        format!("Good geographic proximity ({km:.1} km)")
    } else {
        "Potential match".to_string()
    }
}

/// Within-radius first, then composite score descending.
pub fn rank(a: (&MatchSignals, f64), b: (&MatchSignals, f64)) -> Ordering {
    b.0.within_radius
        .cmp(&a.0.within_radius)
        .then_with(|| b.1.total_cmp(&a.1))
}

/// Effective result count for a caller-supplied limit.
pub fn effective_limit(limit: Option<i64>) -> usize {
    match limit {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(DEFAULT_MATCH_LIMIT),
        _ => DEFAULT_MATCH_LIMIT,
    }
}
