#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for CivicPulse.
//!
//! Accepts civic issue reports, folds near-duplicates into votes on the
//! existing report, and serves ranked zones computed on demand from the
//! live report collection. Reports live in a [`ReportStore`] owned by the
//! application state, optionally backed by a JSON snapshot file.

mod handlers;
pub mod interactive;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use civic_pulse_store::ReportStore;
use civic_pulse_zones_models::{
    DUPLICATE_THRESHOLD_DEGREES, InvalidPrecisionError, Precision, ScoringProfile, ZoneConfig,
};

/// Default port the API listens on.
pub const DEFAULT_PORT: u16 = 5006;

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Errors raised while reading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable held something that is not a valid number.
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber {
        /// Environment variable name.
        var: &'static str,
        /// The raw value.
        value: String,
    },

    /// The precision was out of range.
    #[error(transparent)]
    Precision(#[from] InvalidPrecisionError),

    /// The scoring profile name was not recognised.
    #[error("Unknown scoring profile {value:?} (expected standard or vote_weighted)")]
    Scoring {
        /// The raw value.
        value: String,
    },
}

/// Runtime configuration for the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
    /// Default zone precision and scoring profile.
    pub zones: ZoneConfig,
    /// Near-duplicate distance threshold in degrees.
    pub duplicate_threshold: f64,
    /// Optional JSON snapshot file backing the report store.
    pub data_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            zones: ZoneConfig::default(),
            duplicate_threshold: DUPLICATE_THRESHOLD_DEGREES,
            data_path: None,
        }
    }
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    ///
    /// Recognises `BIND_ADDR`, `PORT`, `CIVIC_PULSE_PRECISION`,
    /// `CIVIC_PULSE_SCORING`, and `CIVIC_PULSE_DATA`. Unset variables fall
    /// back to defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any set variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any provided value is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(bind_addr) = lookup("BIND_ADDR") {
            config.bind_addr = bind_addr;
        }

        if let Some(port) = lookup("PORT") {
            config.port = parse_number("PORT", &port)?;
        }

        if let Some(precision) = lookup("CIVIC_PULSE_PRECISION") {
            config.zones.precision =
                Precision::new(parse_number("CIVIC_PULSE_PRECISION", &precision)?)?;
        }

        if let Some(scoring) = lookup("CIVIC_PULSE_SCORING") {
            config.zones.scoring = parse_scoring(&scoring)?;
        }

        config.data_path = lookup("CIVIC_PULSE_DATA")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        })
}

/// Parses a scoring profile name such as `vote_weighted`.
///
/// # Errors
///
/// Returns [`ConfigError::Scoring`] for unknown names.
pub fn parse_scoring(value: &str) -> Result<ScoringProfile, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Scoring {
            value: value.to_string(),
        })
}

/// Shared application state.
pub struct AppState {
    /// The live report collection.
    pub store: Arc<ReportStore>,
    /// Default zone configuration for cluster requests.
    pub zones: ZoneConfig,
    /// Near-duplicate distance threshold in degrees.
    pub duplicate_threshold: f64,
}

impl AppState {
    /// Creates application state around `store` using `config`'s zone and
    /// duplicate settings.
    #[must_use]
    pub const fn new(store: Arc<ReportStore>, config: &ServerConfig) -> Self {
        Self {
            store,
            zones: config.zones,
            duplicate_threshold: config.duplicate_threshold,
        }
    }
}

/// Registers the `/api` routes.
///
/// Malformed JSON bodies and query strings are answered with a 400 and an
/// `{"error": ...}` body like every other failure.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(handlers::json_error))
            .app_data(web::QueryConfig::default().error_handler(handlers::query_error))
            .route("/health", web::get().to(handlers::health))
            .route("/reports", web::get().to(handlers::list_reports))
            .route("/reports", web::post().to(handlers::create_report))
            .route("/reports/{id}/vote", web::post().to(handlers::vote))
            .route("/clusters", web::get().to(handlers::clusters)),
    );
}

/// Starts the CivicPulse API server.
///
/// Opens the report store (from `config.data_path` when set, otherwise in
/// memory) and serves the API until shutdown. The caller provides the
/// async runtime (e.g. via `#[actix_web::main]`) and initialises logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the snapshot cannot be loaded,
/// or if the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let store = match &config.data_path {
        Some(path) => {
            log::info!("Opening report snapshot {}...", path.display());
            ReportStore::open(path.clone()).map_err(std::io::Error::other)?
        }
        None => {
            log::info!("Using in-memory report store");
            ReportStore::new()
        }
    };

    log::info!(
        "Zones: precision {}, scoring {}",
        config.zones.precision,
        config.zones.scoring
    );

    let state = web::Data::new(AppState::new(Arc::new(store), &config));

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 5006);
        assert_eq!(config.zones.precision, Precision::DEFAULT);
    }

    #[test]
    fn reads_all_variables() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "0.0.0.0"),
            ("PORT", "8080"),
            ("CIVIC_PULSE_PRECISION", "3"),
            ("CIVIC_PULSE_SCORING", "vote_weighted"),
            ("CIVIC_PULSE_DATA", "data/reports.json"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.zones.precision.digits(), 3);
        assert_eq!(config.zones.scoring, ScoringProfile::VoteWeighted);
        assert_eq!(config.data_path, Some(PathBuf::from("data/reports.json")));
    }

    #[test]
    fn rejects_bad_port() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: "PORT", .. }));
    }

    #[test]
    fn rejects_excessive_precision() {
        let err =
            ServerConfig::from_lookup(lookup(&[("CIVIC_PULSE_PRECISION", "12")])).unwrap_err();
        assert!(matches!(err, ConfigError::Precision(_)));
    }

    #[test]
    fn rejects_unknown_scoring() {
        let err =
            ServerConfig::from_lookup(lookup(&[("CIVIC_PULSE_SCORING", "loudest")])).unwrap_err();
        assert!(matches!(err, ConfigError::Scoring { .. }));
    }
}
