//! HTTP handler functions for the CivicPulse API.

use actix_web::error::{InternalError, JsonPayloadError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, web};
use civic_pulse_report_models::ReportSubmission;
use civic_pulse_server_models::{
    ApiError, ApiHealth, ApiReport, ApiZone, CreateReportResponse, ZoneQueryParams,
};
use civic_pulse_store::{StoreError, SubmitOutcome};
use civic_pulse_zones::{dominant_category, ranked_zones};
use civic_pulse_zones_models::{Precision, ZoneConfig};

use crate::{AppState, parse_scoring};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        ok: true,
        service: "civicpulse".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/reports`
///
/// Lists every report, newest first.
pub async fn list_reports(state: web::Data<AppState>) -> HttpResponse {
    let reports: Vec<ApiReport> = state
        .store
        .list_newest_first()
        .into_iter()
        .map(ApiReport::from)
        .collect();
    HttpResponse::Ok().json(reports)
}

/// `POST /api/reports`
///
/// Validates the submission, then either appends it (201) or, when it
/// near-duplicates an existing report, adds a vote to that report (200).
pub async fn create_report(
    state: web::Data<AppState>,
    body: web::Json<ReportSubmission>,
) -> HttpResponse {
    let report = match body.into_inner().validate() {
        Ok(report) => report,
        Err(e) => return HttpResponse::BadRequest().json(ApiError::new(e)),
    };

    match state.store.submit(report, state.duplicate_threshold) {
        Ok(outcome) => {
            let response = CreateReportResponse {
                id: outcome.report().id,
                duplicate: outcome.is_duplicate(),
                votes: outcome.report().votes,
            };
            match outcome {
                SubmitOutcome::Created(_) => HttpResponse::Created().json(response),
                SubmitOutcome::Duplicate(_) => HttpResponse::Ok().json(response),
            }
        }
        Err(e) => {
            log::error!("Failed to store report: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to store report"))
        }
    }
}

/// `POST /api/reports/{id}/vote`
pub async fn vote(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();
    match state.store.increment_votes(id) {
        Ok(report) => HttpResponse::Ok().json(ApiReport::from(report)),
        Err(e @ StoreError::NotFound { .. }) => HttpResponse::NotFound().json(ApiError::new(e)),
        Err(e) => {
            log::error!("Failed to record vote for report {id}: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to record vote"))
        }
    }
}

/// `GET /api/clusters`
///
/// Aggregates the current reports into zones, ranked by confidence.
/// `precision` and `scoring` query parameters override the server
/// defaults for this request only.
pub async fn clusters(
    state: web::Data<AppState>,
    params: web::Query<ZoneQueryParams>,
) -> HttpResponse {
    let config = match resolve_zone_config(state.zones, &params) {
        Ok(config) => config,
        Err(message) => return HttpResponse::BadRequest().json(ApiError::new(message)),
    };

    let reports = state.store.list();
    match ranked_zones(&reports, config) {
        Ok(zones) => {
            let zones: Vec<ApiZone> = zones
                .into_iter()
                .map(|zone| {
                    let top = dominant_category(&zone).map(str::to_string);
                    ApiZone::new(zone, top)
                })
                .collect();
            HttpResponse::Ok().json(zones)
        }
        Err(e) => {
            log::error!("Failed to build zones: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to build zones"))
        }
    }
}

/// Turns a rejected JSON body into a 400 with an [`ApiError`] body.
pub fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    bad_request(err)
}

/// Turns a rejected query string into a 400 with an [`ApiError`] body.
pub fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    bad_request(err)
}

fn bad_request<E>(err: E) -> actix_web::Error
where
    E: std::fmt::Debug + std::fmt::Display + 'static,
{
    let response = HttpResponse::BadRequest().json(ApiError::new(&err));
    InternalError::from_response(err, response).into()
}

fn resolve_zone_config(defaults: ZoneConfig, params: &ZoneQueryParams) -> Result<ZoneConfig, String> {
    let mut config = defaults;
    if let Some(digits) = params.precision {
        config.precision = Precision::new(digits).map_err(|e| e.to_string())?;
    }
    if let Some(scoring) = params.scoring.as_deref() {
        config.scoring = parse_scoring(scoring).map_err(|e| e.to_string())?;
    }
    Ok(config)
}
