#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the CivicPulse server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the report and zone types so the API contract can evolve
//! independently (the API speaks `lat`/`lng`, for instance).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use civic_pulse_report_models::Report;
use civic_pulse_zones_models::Zone;
use serde::{Deserialize, Serialize};

/// A report as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReport {
    /// Unique report ID.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// Category.
    pub category: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Severity.
    pub severity: f64,
    /// Community votes.
    pub votes: u64,
    /// When the report was accepted (ISO 8601).
    pub created_at: DateTime<Utc>,
}

impl From<Report> for ApiReport {
    fn from(report: Report) -> Self {
        Self {
            id: report.id,
            title: report.title,
            category: report.category,
            lat: report.latitude,
            lng: report.longitude,
            severity: report.severity,
            votes: report.votes,
            created_at: report.created_at,
        }
    }
}

/// Response to a report submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportResponse {
    /// ID of the new report, or of the existing report it duplicated.
    pub id: i64,
    /// Whether the submission was folded into an existing report.
    pub duplicate: bool,
    /// Current vote count of the resolved report.
    pub votes: u64,
}

/// A ranked zone as returned by the clusters endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiZone {
    /// Quantized zone key, e.g. `"28.5,77.0"`.
    pub key: String,
    /// Anchor latitude (first report seen in the zone).
    pub lat: f64,
    /// Anchor longitude (first report seen in the zone).
    pub lng: f64,
    /// Number of reports in the zone.
    pub total: u64,
    /// Mean severity (2 decimal places).
    pub avg_severity: f64,
    /// Summed votes.
    pub votes: u64,
    /// Report count per category.
    pub categories: BTreeMap<String, u64>,
    /// Confidence score (0-99).
    pub confidence: f64,
    /// Whether the zone warrants escalation.
    pub alert: bool,
    /// Category with the most reports.
    pub top_category: Option<String>,
}

impl ApiZone {
    /// Builds the API view of `zone` with its precomputed dominant category.
    #[must_use]
    pub fn new(zone: Zone, top_category: Option<String>) -> Self {
        Self {
            key: zone.key.to_string(),
            lat: zone.anchor_lat,
            lng: zone.anchor_lng,
            total: zone.total,
            avg_severity: zone.avg_severity,
            votes: zone.votes,
            categories: zone.categories,
            confidence: zone.confidence,
            alert: zone.alert,
            top_category,
        }
    }
}

/// Query parameters for the clusters endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneQueryParams {
    /// Quantization precision override (decimal places).
    pub precision: Option<u8>,
    /// Scoring profile override (`standard` or `vote_weighted`).
    pub scoring: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub ok: bool,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
}

/// Error body returned for failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable error message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body from any displayable error.
    #[must_use]
    pub fn new(error: impl std::fmt::Display) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}
