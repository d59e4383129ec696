#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone clustering and confidence-scoring engine.
//!
//! Takes an unordered collection of [`Report`]s and produces ranked zone
//! summaries: reports are bucketed by quantized coordinates
//! ([`quantize`]), folded into per-zone statistics ([`aggregate`]), scored
//! ([`score`]), and sorted by confidence ([`rank`]). The [`duplicate`]
//! module decides whether an incoming report is a near-duplicate of an
//! existing one.
//!
//! Everything here is a pure, synchronous transform over a snapshot of the
//! report collection. Callers that share the collection across threads
//! must serialize mutations themselves and hand the engine a snapshot.

pub mod aggregate;
pub mod duplicate;
pub mod quantize;
pub mod rank;
pub mod score;

use civic_pulse_report_models::Report;
use civic_pulse_zones_models::{Zone, ZoneConfig};

pub use aggregate::{ZoneStats, aggregate};
pub use duplicate::{Geotagged, find_duplicate, is_duplicate};
pub use quantize::quantize;
pub use rank::{dominant_category, rank};
pub use score::{Score, score};

/// Errors produced by the zone engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ZoneError {
    /// A report carried a NaN or infinite number.
    #[error("Report {report_id} has non-finite {field}: {value}")]
    InvalidInput {
        /// Id of the offending report.
        report_id: i64,
        /// Name of the offending field.
        field: &'static str,
        /// The offending value.
        value: f64,
    },
}

/// Aggregates and scores `reports`, returning zones in discovery order.
///
/// # Errors
///
/// Returns [`ZoneError::InvalidInput`] if any report carries a non-finite
/// number.
pub fn build_zones(reports: &[Report], config: ZoneConfig) -> Result<Vec<Zone>, ZoneError> {
    Ok(aggregate(reports, config.precision)?
        .into_iter()
        .map(|stats| stats.into_zone(config.scoring))
        .collect())
}

/// Aggregates, scores, and ranks `reports` by confidence, highest first.
///
/// # Errors
///
/// Returns [`ZoneError::InvalidInput`] if any report carries a non-finite
/// number.
pub fn ranked_zones(reports: &[Report], config: ZoneConfig) -> Result<Vec<Zone>, ZoneError> {
    let zones = rank(build_zones(reports, config)?);
    log::debug!(
        "Ranked {} zones ({} alerting)",
        zones.len(),
        zones.iter().filter(|z| z.alert).count()
    );
    Ok(zones)
}
