//! Near-duplicate detection for incoming reports.
//!
//! Distance is planar Euclidean distance in decimal degrees. That is a
//! crude approximation (a degree of longitude shrinks toward the poles)
//! but it is adequate at city-block scale, which is all the threshold is
//! meant to capture.

use civic_pulse_report_models::{NewReport, Report};
use civic_pulse_zones_models::DUPLICATE_THRESHOLD_DEGREES;

/// Anything with a location and a category that can be compared for
/// duplication.
pub trait Geotagged {
    /// Latitude in decimal degrees.
    fn latitude(&self) -> f64;
    /// Longitude in decimal degrees.
    fn longitude(&self) -> f64;
    /// Case-sensitive category.
    fn category(&self) -> &str;
}

impl Geotagged for Report {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }

    fn category(&self) -> &str {
        &self.category
    }
}

impl Geotagged for NewReport {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }

    fn category(&self) -> &str {
        &self.category
    }
}

/// Planar distance between two locations, in degrees.
#[must_use]
pub fn planar_distance(a: &impl Geotagged, b: &impl Geotagged) -> f64 {
    (a.latitude() - b.latitude()).hypot(a.longitude() - b.longitude())
}

/// Returns the first report in `existing` that `candidate` duplicates.
///
/// A match requires an identical category and a distance strictly below
/// `threshold`. The scan stops at the first match; later, closer matches
/// are not considered.
pub fn find_duplicate<'a>(
    candidate: &impl Geotagged,
    existing: &'a [Report],
    threshold: f64,
) -> Option<&'a Report> {
    existing.iter().find(|report| {
        report.category == candidate.category() && planar_distance(candidate, *report) < threshold
    })
}

/// Whether `candidate` duplicates any report in `existing` under the
/// default [`DUPLICATE_THRESHOLD_DEGREES`].
#[must_use]
pub fn is_duplicate(candidate: &impl Geotagged, existing: &[Report]) -> bool {
    find_duplicate(candidate, existing, DUPLICATE_THRESHOLD_DEGREES).is_some()
}
