#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Civic issue report types and ingestion-boundary validation.
//!
//! A [`Report`] is the strongly-typed record every other crate works with.
//! Raw client input arrives as a [`ReportSubmission`], whose numeric fields
//! may be JSON numbers or numeric strings. [`ReportSubmission::validate`] is
//! the only place loose input is coerced; nothing downstream of it ever
//! sees an empty title, an empty category, or a non-finite number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum absolute latitude in decimal degrees.
pub const MAX_LATITUDE: f64 = 90.0;

/// Maximum absolute longitude in decimal degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// A persisted civic issue report.
///
/// Immutable once created except for [`Report::votes`], which only ever
/// increases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Unique identifier, assigned by the store and never reused.
    pub id: i64,
    /// Short display title.
    pub title: String,
    /// Free-form category (case-sensitive, e.g. `"Pothole"`).
    pub category: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Severity, observed on a 1-10 scale.
    pub severity: f64,
    /// Community upvotes.
    #[serde(default)]
    pub votes: u64,
    /// When the report was accepted by the store.
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// Builds a persisted report from a validated [`NewReport`].
    ///
    /// Votes always start at zero.
    #[must_use]
    pub fn from_new(id: i64, report: NewReport, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: report.title,
            category: report.category,
            latitude: report.latitude,
            longitude: report.longitude,
            severity: report.severity,
            votes: 0,
            created_at,
        }
    }
}

/// A validated report that has not yet been assigned an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    /// Short display title (non-empty).
    pub title: String,
    /// Free-form category (non-empty).
    pub category: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Severity, observed on a 1-10 scale.
    pub severity: f64,
}

/// Raw report input as submitted by a client.
///
/// Field names follow the public API (`lat`, `lng`). Numeric fields accept
/// either JSON numbers or strings holding a number.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSubmission {
    /// Report title.
    pub title: Option<String>,
    /// Report category.
    pub category: Option<String>,
    /// Latitude.
    pub lat: Option<serde_json::Value>,
    /// Longitude.
    pub lng: Option<serde_json::Value>,
    /// Severity.
    pub severity: Option<serde_json::Value>,
}

/// Errors produced while validating a [`ReportSubmission`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A numeric field could not be interpreted as a number.
    #[error("{field} must be a number, got {value}")]
    NotNumeric {
        /// Name of the offending field.
        field: &'static str,
        /// The raw value that was supplied.
        value: String,
    },

    /// A numeric field was NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A coordinate fell outside its valid range.
    #[error("{field} {value} is outside [-{max}, {max}]")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The supplied value.
        value: f64,
        /// The allowed absolute maximum.
        max: f64,
    },
}

impl ReportSubmission {
    /// Validates and coerces the submission into a [`NewReport`].
    ///
    /// Title and category are trimmed and must be non-empty. Coordinates
    /// and severity must be finite numbers; coordinates must lie within
    /// the valid latitude/longitude ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered, checking title,
    /// category, latitude, longitude, and severity in that order.
    pub fn validate(self) -> Result<NewReport, ValidationError> {
        let title = required_text("title", self.title)?;
        let category = required_text("category", self.category)?;

        let latitude = coerce_number("lat", self.lat.as_ref())?;
        check_range("lat", latitude, MAX_LATITUDE)?;

        let longitude = coerce_number("lng", self.lng.as_ref())?;
        check_range("lng", longitude, MAX_LONGITUDE)?;

        let severity = coerce_number("severity", self.severity.as_ref())?;

        Ok(NewReport {
            title,
            category,
            latitude,
            longitude,
            severity,
        })
    }
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField { field })?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(trimmed.to_string())
}

/// Interprets a JSON value as an `f64`, accepting numbers and numeric
/// strings.
fn coerce_number(
    field: &'static str,
    value: Option<&serde_json::Value>,
) -> Result<f64, ValidationError> {
    let number = match value {
        None | Some(serde_json::Value::Null) => {
            return Err(ValidationError::MissingField { field });
        }
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    let number = number.ok_or_else(|| ValidationError::NotNumeric {
        field,
        value: value.map(ToString::to_string).unwrap_or_default(),
    })?;

    if number.is_finite() {
        Ok(number)
    } else {
        Err(ValidationError::NotFinite { field })
    }
}

fn check_range(field: &'static str, value: f64, max: f64) -> Result<(), ValidationError> {
    if value.abs() > max {
        return Err(ValidationError::OutOfRange { field, value, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submission(value: serde_json::Value) -> ReportSubmission {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn validates_numeric_fields() {
        let report = submission(json!({
            "title": "Deep pothole",
            "category": "Pothole",
            "lat": 28.4595,
            "lng": 77.0266,
            "severity": 8
        }))
        .validate()
        .unwrap();

        assert_eq!(report.title, "Deep pothole");
        assert_eq!(report.category, "Pothole");
        assert!((report.latitude - 28.4595).abs() < f64::EPSILON);
        assert!((report.longitude - 77.0266).abs() < f64::EPSILON);
        assert!((report.severity - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn coerces_numeric_strings() {
        let report = submission(json!({
            "title": "Broken light",
            "category": "Streetlight",
            "lat": " 28.5 ",
            "lng": "77.1",
            "severity": "6"
        }))
        .validate()
        .unwrap();

        assert!((report.latitude - 28.5).abs() < f64::EPSILON);
        assert!((report.longitude - 77.1).abs() < f64::EPSILON);
        assert!((report.severity - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_blank_title() {
        let err = submission(json!({
            "title": "   ",
            "category": "Pothole",
            "lat": 1.0,
            "lng": 1.0,
            "severity": 1
        }))
        .validate()
        .unwrap_err();

        assert_eq!(err, ValidationError::MissingField { field: "title" });
    }

    #[test]
    fn rejects_missing_category() {
        let err = submission(json!({
            "title": "Something",
            "lat": 1.0,
            "lng": 1.0,
            "severity": 1
        }))
        .validate()
        .unwrap_err();

        assert_eq!(err, ValidationError::MissingField { field: "category" });
    }

    #[test]
    fn rejects_non_numeric_coordinates() {
        let err = submission(json!({
            "title": "Something",
            "category": "Pothole",
            "lat": "north",
            "lng": 1.0,
            "severity": 1
        }))
        .validate()
        .unwrap_err();

        assert!(matches!(err, ValidationError::NotNumeric { field: "lat", .. }));
    }

    #[test]
    fn rejects_non_finite_strings() {
        let err = submission(json!({
            "title": "Something",
            "category": "Pothole",
            "lat": 1.0,
            "lng": 1.0,
            "severity": "NaN"
        }))
        .validate()
        .unwrap_err();

        assert_eq!(err, ValidationError::NotFinite { field: "severity" });
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let err = submission(json!({
            "title": "Something",
            "category": "Pothole",
            "lat": 91.0,
            "lng": 1.0,
            "severity": 1
        }))
        .validate()
        .unwrap_err();

        assert!(matches!(err, ValidationError::OutOfRange { field: "lat", .. }));
    }

    #[test]
    fn new_reports_start_without_votes() {
        let new = NewReport {
            title: "t".to_string(),
            category: "c".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            severity: 3.0,
        };
        let report = Report::from_new(7, new, Utc::now());
        assert_eq!(report.id, 7);
        assert_eq!(report.votes, 0);
    }

    #[test]
    fn snapshot_rows_default_votes() {
        let report: Report = serde_json::from_value(json!({
            "id": 1,
            "title": "t",
            "category": "c",
            "latitude": 1.0,
            "longitude": 2.0,
            "severity": 5.0,
            "createdAt": "2024-01-15T14:30:00Z"
        }))
        .unwrap();
        assert_eq!(report.votes, 0);
    }
}
