//! Groups reports into zones and accumulates per-zone statistics.

use std::collections::BTreeMap;

use civic_pulse_report_models::Report;
use civic_pulse_zones_models::{Precision, ScoringProfile, Zone, ZoneKey};

use crate::ZoneError;
use crate::quantize::{quantize, round_places};
use crate::score::score;

/// Unscored statistics for one zone.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneStats {
    /// Quantized coordinate key.
    pub key: ZoneKey,
    /// Latitude of the first member seen.
    pub anchor_lat: f64,
    /// Longitude of the first member seen.
    pub anchor_lng: f64,
    /// Number of member reports.
    pub total: u64,
    /// Mean member severity, rounded to 2 decimal places.
    pub avg_severity: f64,
    /// Sum of member votes.
    pub votes: u64,
    /// Member count per category.
    pub categories: BTreeMap<String, u64>,
    /// Member report ids in input order.
    pub members: Vec<i64>,
}

impl ZoneStats {
    /// Scores these statistics with `profile` and produces the final
    /// [`Zone`].
    #[must_use]
    pub fn into_zone(self, profile: ScoringProfile) -> Zone {
        let score = score(&self, profile.weights());
        Zone {
            key: self.key,
            anchor_lat: self.anchor_lat,
            anchor_lng: self.anchor_lng,
            total: self.total,
            avg_severity: self.avg_severity,
            votes: self.votes,
            categories: self.categories,
            confidence: score.confidence,
            alert: score.alert,
        }
    }
}

struct Accumulator {
    key: ZoneKey,
    anchor_lat: f64,
    anchor_lng: f64,
    total: u64,
    severity_sum: f64,
    votes: u64,
    categories: BTreeMap<String, u64>,
    members: Vec<i64>,
}

impl Accumulator {
    const fn new(key: ZoneKey, anchor_lat: f64, anchor_lng: f64) -> Self {
        Self {
            key,
            anchor_lat,
            anchor_lng,
            total: 0,
            severity_sum: 0.0,
            votes: 0,
            categories: BTreeMap::new(),
            members: Vec::new(),
        }
    }

    fn fold(&mut self, report: &Report) {
        self.total += 1;
        self.severity_sum += report.severity;
        self.votes += report.votes;
        *self.categories.entry(report.category.clone()).or_insert(0) += 1;
        self.members.push(report.id);
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self) -> ZoneStats {
        // Finalized once from the full sum; a running mean drifts.
        let avg_severity = round_places(self.severity_sum / self.total as f64, 2);
        ZoneStats {
            key: self.key,
            anchor_lat: self.anchor_lat,
            anchor_lng: self.anchor_lng,
            total: self.total,
            avg_severity,
            votes: self.votes,
            categories: self.categories,
            members: self.members,
        }
    }
}

/// Groups `reports` by quantized coordinates.
///
/// Produces exactly one [`ZoneStats`] per distinct key, in the order each
/// key was first seen. A zone is anchored to the raw coordinates of its
/// first member (first member wins, not a centroid). An empty input yields
/// an empty result.
///
/// # Errors
///
/// Returns [`ZoneError::InvalidInput`] if any report carries a non-finite
/// latitude, longitude, or severity.
pub fn aggregate(reports: &[Report], precision: Precision) -> Result<Vec<ZoneStats>, ZoneError> {
    let mut index: BTreeMap<ZoneKey, usize> = BTreeMap::new();
    let mut zones: Vec<Accumulator> = Vec::new();

    for report in reports {
        check_finite(report)?;

        let key = quantize(report.latitude, report.longitude, precision);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            zones.push(Accumulator::new(key, report.latitude, report.longitude));
            zones.len() - 1
        });
        zones[slot].fold(report);
    }

    log::debug!(
        "Aggregated {} reports into {} zones at precision {precision}",
        reports.len(),
        zones.len()
    );

    Ok(zones.into_iter().map(Accumulator::finish).collect())
}

fn check_finite(report: &Report) -> Result<(), ZoneError> {
    for (field, value) in [
        ("latitude", report.latitude),
        ("longitude", report.longitude),
        ("severity", report.severity),
    ] {
        if !value.is_finite() {
            return Err(ZoneError::InvalidInput {
                report_id: report.id,
                field,
                value,
            });
        }
    }
    Ok(())
}
