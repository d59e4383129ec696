//! Ranking and presentation helpers for scored zones.

use civic_pulse_zones_models::Zone;

/// Sorts zones by confidence, highest first.
///
/// The sort is stable: zones with equal confidence keep the order they
/// were discovered in during aggregation.
#[must_use]
pub fn rank(mut zones: Vec<Zone>) -> Vec<Zone> {
    zones.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    zones
}

/// Returns the category with the most members in `zone`.
///
/// Ties go to the alphabetically first category name. Returns `None` only
/// when the zone has no categories.
#[must_use]
pub fn dominant_category(zone: &Zone) -> Option<&str> {
    zone.categories
        .iter()
        .max_by(|(name_a, count_a), (name_b, count_b)| {
            count_a.cmp(count_b).then_with(|| name_b.cmp(name_a))
        })
        .map(|(name, _)| name.as_str())
}
