#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone types, quantization precision, and confidence scoring profiles.
//!
//! A [`Zone`] is a derived view over the reports that share a
//! [`ZoneKey`]. Zones are recomputed from the live report collection on
//! every request and never persisted. The weights and thresholds that
//! drive confidence scoring live here as named constants so they can be
//! inspected and tested independently of the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Upper bound on a zone's confidence score. Confidence never reaches 100.
pub const MAX_CONFIDENCE: f64 = 99.0;

/// Lower bound on a zone's confidence score.
pub const MIN_CONFIDENCE: f64 = 0.0;

/// A zone only alerts when its average severity is strictly above this.
pub const ALERT_SEVERITY_THRESHOLD: f64 = 8.0;

/// A zone only alerts when its confidence is strictly above this.
pub const ALERT_CONFIDENCE_THRESHOLD: f64 = 90.0;

/// A zone only alerts when it has strictly more reports than this.
pub const ALERT_MIN_REPORTS: u64 = 2;

/// Near-duplicate distance threshold in decimal degrees (planar).
pub const DUPLICATE_THRESHOLD_DEGREES: f64 = 0.0012;

/// Number of decimal places retained when quantizing coordinates.
///
/// One digit buckets reports into cells roughly 11 km tall; three digits
/// gives city-block cells of roughly 110 m.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Precision(u8);

impl Precision {
    /// The coarsest supported precision (whole degrees).
    pub const MIN: Self = Self(0);

    /// The finest supported precision.
    pub const MAX: Self = Self(8);

    /// One decimal place, the default zone granularity.
    pub const DEFAULT: Self = Self(1);

    /// Creates a precision from a digit count.
    ///
    /// # Errors
    ///
    /// Returns an error if `digits` exceeds [`Precision::MAX`].
    pub const fn new(digits: u8) -> Result<Self, InvalidPrecisionError> {
        if digits > Self::MAX.0 {
            return Err(InvalidPrecisionError { digits });
        }
        Ok(Self(digits))
    }

    /// Returns the number of decimal places.
    #[must_use]
    pub const fn digits(self) -> u8 {
        self.0
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for Precision {
    type Error = InvalidPrecisionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Precision> for u8 {
    fn from(value: Precision) -> Self {
        value.0
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when attempting to create a [`Precision`] beyond the
/// supported range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPrecisionError {
    /// The rejected digit count.
    pub digits: u8,
}

impl std::fmt::Display for InvalidPrecisionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid precision {}: expected 0-{}",
            self.digits,
            Precision::MAX.0
        )
    }
}

impl std::error::Error for InvalidPrecisionError {}

/// Weights for the linear confidence formula:
///
/// `baseline + per_report * total + per_vote * votes + per_severity * avg_severity`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    /// Constant offset applied to every zone.
    pub baseline: f64,
    /// Weight applied to the zone's report count.
    pub per_report: f64,
    /// Weight applied to the zone's summed votes.
    pub per_vote: f64,
    /// Weight applied to the zone's average severity.
    pub per_severity: f64,
}

impl ScoringWeights {
    /// Canonical weights: `45 + 9 * total + 3 * avg_severity`.
    pub const STANDARD: Self = Self {
        baseline: 45.0,
        per_report: 9.0,
        per_vote: 0.0,
        per_severity: 3.0,
    };

    /// Community-weighted variant:
    /// `38 + 11 * total + 1.5 * votes + 3 * avg_severity`.
    pub const VOTE_WEIGHTED: Self = Self {
        baseline: 38.0,
        per_report: 11.0,
        per_vote: 1.5,
        per_severity: 3.0,
    };
}

/// Named selection of [`ScoringWeights`].
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScoringProfile {
    /// Report count and severity only. See [`ScoringWeights::STANDARD`].
    #[default]
    Standard,
    /// Also rewards community votes. See [`ScoringWeights::VOTE_WEIGHTED`].
    VoteWeighted,
}

impl ScoringProfile {
    /// Returns the weights for this profile.
    #[must_use]
    pub const fn weights(self) -> ScoringWeights {
        match self {
            Self::Standard => ScoringWeights::STANDARD,
            Self::VoteWeighted => ScoringWeights::VOTE_WEIGHTED,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Standard, Self::VoteWeighted]
    }
}

/// Configuration for a single aggregation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneConfig {
    /// Coordinate quantization precision.
    pub precision: Precision,
    /// Confidence scoring profile.
    pub scoring: ScoringProfile,
}

/// Textual key shared by all reports in one zone, e.g. `"28.5,77.0"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneKey(String);

impl ZoneKey {
    /// Wraps an already formatted key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ZoneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregated, scored view over every report sharing a [`ZoneKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Quantized coordinate key.
    pub key: ZoneKey,
    /// Latitude of the first report seen in this zone.
    pub anchor_lat: f64,
    /// Longitude of the first report seen in this zone.
    pub anchor_lng: f64,
    /// Number of member reports.
    pub total: u64,
    /// Mean member severity, rounded to 2 decimal places.
    pub avg_severity: f64,
    /// Sum of member votes.
    pub votes: u64,
    /// Member count per category.
    pub categories: BTreeMap<String, u64>,
    /// Confidence score in `[0, 99]`, rounded to 1 decimal place.
    pub confidence: f64,
    /// Whether severity, confidence, and corroboration all warrant escalation.
    pub alert: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_range() {
        for digits in 0..=8u8 {
            assert_eq!(Precision::new(digits).unwrap().digits(), digits);
        }
        assert_eq!(
            Precision::new(9).unwrap_err(),
            InvalidPrecisionError { digits: 9 }
        );
    }

    #[test]
    fn scoring_profile_parses_snake_case() {
        assert_eq!(
            "vote_weighted".parse::<ScoringProfile>().unwrap(),
            ScoringProfile::VoteWeighted
        );
        assert_eq!(ScoringProfile::Standard.to_string(), "standard");
        assert!("loud".parse::<ScoringProfile>().is_err());
    }

    #[test]
    fn default_config_is_one_digit_standard() {
        let config = ZoneConfig::default();
        assert_eq!(config.precision.digits(), 1);
        assert_eq!(config.scoring, ScoringProfile::Standard);
    }

    #[test]
    fn standard_profile_ignores_votes() {
        let weights = ScoringProfile::Standard.weights();
        assert!(weights.per_vote.abs() < f64::EPSILON);
        assert!((weights.baseline - 45.0).abs() < f64::EPSILON);
    }
}
