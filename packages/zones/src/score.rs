//! Confidence scoring and escalation.
//!
//! Confidence grows linearly with corroboration (report count), community
//! votes, and average severity, then saturates at [`MAX_CONFIDENCE`]. A
//! zone only alerts when severity, confidence, and corroboration all
//! clear their thresholds.

use civic_pulse_zones_models::{
    ALERT_CONFIDENCE_THRESHOLD, ALERT_MIN_REPORTS, ALERT_SEVERITY_THRESHOLD, MAX_CONFIDENCE,
    MIN_CONFIDENCE, ScoringWeights,
};

use crate::aggregate::ZoneStats;
use crate::quantize::round_places;

/// Confidence and alert flag derived from one zone's statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    /// Confidence in `[0, 99]`, rounded to 1 decimal place.
    pub confidence: f64,
    /// Whether the zone warrants escalation.
    pub alert: bool,
}

/// Scores a zone's statistics with the given weights.
#[must_use]
pub fn score(stats: &ZoneStats, weights: ScoringWeights) -> Score {
    let confidence = confidence(stats.total, stats.votes, stats.avg_severity, weights);
    Score {
        confidence,
        alert: is_alert(stats.total, stats.avg_severity, confidence),
    }
}

/// Computes the clamped, rounded confidence score.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn confidence(total: u64, votes: u64, avg_severity: f64, weights: ScoringWeights) -> f64 {
    let raw = weights.per_vote.mul_add(
        votes as f64,
        weights
            .per_severity
            .mul_add(avg_severity, weights.per_report.mul_add(total as f64, weights.baseline)),
    );
    round_places(raw.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE), 1)
}

/// Returns `true` only when all three escalation thresholds are exceeded.
#[must_use]
pub fn is_alert(total: u64, avg_severity: f64, confidence: f64) -> bool {
    avg_severity > ALERT_SEVERITY_THRESHOLD
        && confidence > ALERT_CONFIDENCE_THRESHOLD
        && total > ALERT_MIN_REPORTS
}
